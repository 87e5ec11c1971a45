// src/core/context.rs

use crate::core::config::{ProxyConfig, ProxyOverride, ScanConfig};
use crate::core::directory::DescriptorCache;
use crate::core::transport::{ProxyTransport, Transport};
use crate::error::ProbeError;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

/// Builds the transport once the proxy address is known.
pub type TransportFactory =
    Box<dyn Fn(&ProxyConfig) -> Result<Arc<dyn Transport>, ProbeError> + Send + Sync>;

/// Process-lifetime state shared by every scan: the lazily built proxy
/// transport and the directory descriptor cache.
pub struct ScanContext {
    config: ScanConfig,
    proxy: ProxyOverride,
    factory: TransportFactory,
    transport: OnceCell<Arc<dyn Transport>>,
    descriptors: DescriptorCache,
}

impl ScanContext {
    pub fn new(config: ScanConfig, proxy: ProxyOverride) -> Self {
        let accept_invalid_certs = config.accept_invalid_certs;
        let factory: TransportFactory = Box::new(move |proxy: &ProxyConfig| {
            let transport = ProxyTransport::new(proxy.clone(), accept_invalid_certs)?;
            Ok(Arc::new(transport) as Arc<dyn Transport>)
        });
        Self::with_factory(config, proxy, factory)
    }

    pub fn with_factory(config: ScanConfig, proxy: ProxyOverride, factory: TransportFactory) -> Self {
        let descriptors = DescriptorCache::new(config.descriptor_failure_ttl);
        Self { config, proxy, factory, transport: OnceCell::new(), descriptors }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Returns the shared transport, resolving the proxy address and building it
    /// on first use. A failed build is not cached.
    pub fn transport(&self) -> Result<Arc<dyn Transport>, ProbeError> {
        self.transport
            .get_or_try_init(|| {
                let proxy = ProxyConfig::resolve(&self.proxy);
                info!(proxy = %proxy.addr(), "Initializing shared proxy transport.");
                (self.factory)(&proxy)
            })
            .cloned()
    }

    /// Drops the shared transport so the next call to [`ScanContext::transport`] rebuilds it.
    pub fn reset_transport(&mut self) {
        self.transport.take();
    }

    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::HttpResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::net::TcpStream;

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn get(&self, _url: &str, _timeout: Duration) -> Result<HttpResponse, ProbeError> {
            Err(ProbeError::Refused)
        }

        async fn connect(&self, _host: &str, _port: u16, _timeout: Duration) -> Result<TcpStream, ProbeError> {
            Err(ProbeError::Refused)
        }
    }

    fn counting_context(seen: Arc<Mutex<Vec<ProxyConfig>>>) -> ScanContext {
        let proxy = ProxyOverride { host: Some("host".into()), port: Some("1234".into()) };
        ScanContext::with_factory(
            ScanConfig::default(),
            proxy,
            Box::new(move |cfg: &ProxyConfig| {
                seen.lock().unwrap().push(cfg.clone());
                Ok(Arc::new(NullTransport) as Arc<dyn Transport>)
            }),
        )
    }

    #[test]
    fn transport_is_built_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ctx = counting_context(seen.clone());

        let first = ctx.transport().unwrap();
        let second = ctx.transport().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].socks_url(), "socks5h://host:1234");
    }

    #[test]
    fn reset_rebuilds_the_transport() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = counting_context(seen.clone());

        let first = ctx.transport().unwrap();
        ctx.reset_transport();
        let second = ctx.transport().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn concurrent_first_access_builds_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ctx = Arc::new(counting_context(seen.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || ctx.transport().unwrap())
            })
            .collect();
        let transports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(transports.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn failed_build_is_retried() {
        let attempts = Arc::new(Mutex::new(0));
        let counter = attempts.clone();
        let ctx = ScanContext::with_factory(
            ScanConfig::default(),
            ProxyOverride::default(),
            Box::new(move |_cfg: &ProxyConfig| {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n == 1 {
                    Err(ProbeError::Setup("boom".into()))
                } else {
                    Ok(Arc::new(NullTransport) as Arc<dyn Transport>)
                }
            }),
        );

        assert!(ctx.transport().is_err());
        assert!(ctx.transport().is_ok());
        assert_eq!(*attempts.lock().unwrap(), 2);
    }
}
