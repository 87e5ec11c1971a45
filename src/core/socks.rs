// src/core/socks.rs

//! Minimal SOCKS5 client: no-auth greeting followed by a CONNECT request that
//! carries the destination as a domain name, so `.onion` names are resolved by
//! the proxy and never locally.

use crate::core::config::ProxyConfig;
use crate::error::ProbeError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const SOCKS_VERSION: u8 = 0x05;
const METHOD_NO_AUTH: u8 = 0x00;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;
const REPLY_SUCCEEDED: u8 = 0x00;
const REPLY_CONNECTION_REFUSED: u8 = 0x05;

/// Opens a TCP stream to `host:port` tunneled through the proxy.
pub async fn connect(proxy: &ProxyConfig, host: &str, port: u16) -> Result<TcpStream, ProbeError> {
    let addr = proxy.addr();
    debug!(proxy = %addr, host, port, "Opening SOCKS5 tunnel.");
    let mut stream = TcpStream::connect((proxy.host.as_str(), proxy.port))
        .await
        .map_err(|source| ProbeError::ProxyUnavailable { addr: addr.clone(), source })?;

    greet(&mut stream).await?;
    request_connect(&mut stream, host, port).await?;
    Ok(stream)
}

async fn greet(stream: &mut TcpStream) -> Result<(), ProbeError> {
    stream.write_all(&[SOCKS_VERSION, 1, METHOD_NO_AUTH]).await?;

    let mut response = [0u8; 2];
    stream.read_exact(&mut response).await?;

    if response[0] != SOCKS_VERSION {
        return Err(ProbeError::Socks(format!("unexpected version byte {:#04x}", response[0])));
    }
    if response[1] != METHOD_NO_AUTH {
        return Err(ProbeError::Socks(format!("proxy requires auth method {:#04x}", response[1])));
    }
    Ok(())
}

async fn request_connect(stream: &mut TcpStream, host: &str, port: u16) -> Result<(), ProbeError> {
    let name = host.as_bytes();
    if name.is_empty() || name.len() > 255 {
        return Err(ProbeError::Socks(format!("invalid destination host {host:?}")));
    }

    let request = [
        vec![SOCKS_VERSION, CMD_CONNECT, 0x00, ATYP_DOMAIN, name.len() as u8],
        name.to_vec(),
        port.to_be_bytes().to_vec(),
    ]
    .concat();
    stream.write_all(&request).await?;

    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    if header[0] != SOCKS_VERSION {
        return Err(ProbeError::Socks(format!("unexpected version byte {:#04x}", header[0])));
    }

    // Drain BND.ADDR + BND.PORT so the stream is positioned at the tunneled payload.
    match header[3] {
        ATYP_IPV4 => {
            let mut rest = [0u8; 6];
            stream.read_exact(&mut rest).await?;
        }
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            let mut rest = vec![0u8; len[0] as usize + 2];
            stream.read_exact(&mut rest).await?;
        }
        ATYP_IPV6 => {
            let mut rest = [0u8; 18];
            stream.read_exact(&mut rest).await?;
        }
        other => return Err(ProbeError::Socks(format!("unknown address type {other:#04x}"))),
    }

    match header[1] {
        REPLY_SUCCEEDED => Ok(()),
        REPLY_CONNECTION_REFUSED => Err(ProbeError::Refused),
        code => Err(ProbeError::Socks(reply_message(code).to_string())),
    }
}

fn reply_message(code: u8) -> &'static str {
    match code {
        0x01 => "general SOCKS server failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown reply code",
    }
}
