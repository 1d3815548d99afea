use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use oxide_shard_core::{Context, Error, Result};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Slave, Slaves, close_all};
use crate::dsn::Dsn;
use crate::source::DataSource;

/// Opens a handle for a spliced DSN.
pub type Opener = Arc<dyn Fn(&str) -> Result<Arc<dyn DataSource>> + Send + Sync>;

/// Resolves a discovery domain to addresses.
#[async_trait]
pub trait Resolver: fmt::Debug + Send + Sync {
    /// Returns the addresses of `host`.
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>>;
}

/// System resolver through `tokio::net::lookup_host`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioResolver;

#[async_trait]
impl Resolver for TokioResolver {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(Error::database)?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

/// Replicas discovered from the DNS records of the DSN host.
///
/// Every `interval` the host is resolved again, each address is spliced into
/// the DSN and the replica list is swapped when it changed. Handles kept
/// across refreshes are reused; dropped ones are closed.
pub struct DnsSlaves {
    inner: Arc<Inner>,
}

struct Inner {
    dsn: Dsn,
    resolver: Arc<dyn Resolver>,
    opener: Opener,
    slaves: RwLock<Vec<Slave>>,
    cnt: AtomicUsize,
    cancel: CancellationToken,
}

impl fmt::Debug for DnsSlaves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsSlaves")
            .field("host", &self.inner.dsn.host())
            .field("slaves", &self.slave_names())
            .field("closed", &self.inner.cancel.is_cancelled())
            .finish()
    }
}

impl DnsSlaves {
    /// Resolves the DSN host once, then keeps refreshing in the background.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDsn`] for unparsable DSNs, and resolution or open
    /// errors of the first refresh.
    pub async fn start(
        dsn: &str,
        interval: Duration,
        resolver: Arc<dyn Resolver>,
        opener: Opener,
    ) -> Result<Self> {
        let inner = Arc::new(Inner {
            dsn: Dsn::parse(dsn)?,
            resolver,
            opener,
            slaves: RwLock::new(Vec::new()),
            cnt: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
        });
        inner.refresh().await?;

        let token = inner.cancel.clone();
        let task = Arc::clone(&inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = task.refresh().await {
                            warn!(host = task.dsn.host(), error = %err, "slave refresh failed");
                        }
                    }
                }
            }
            debug!(host = task.dsn.host(), "slave refresher stopped");
        });

        Ok(Self { inner })
    }

    /// Returns the current replica names, the spliced DSNs.
    #[must_use]
    pub fn slave_names(&self) -> Vec<String> {
        self.inner.slaves.read().iter().map(|s| s.name.clone()).collect()
    }

    /// Resolves and swaps the replica list now.
    ///
    /// Returns `true` when the list changed. Once closed, nothing is
    /// published and the handles opened by this refresh are closed.
    ///
    /// # Errors
    ///
    /// Resolution or open errors; the current list is kept.
    pub async fn refresh(&self) -> Result<bool> {
        self.inner.refresh().await
    }
}

impl Inner {
    async fn refresh(&self) -> Result<bool> {
        let mut ips = self
            .resolver
            .lookup(self.dsn.host(), self.dsn.port())
            .await?;
        ips.sort_unstable();
        ips.dedup();
        let names = ips
            .iter()
            .map(|ip| self.dsn.splice(&ip.to_string()))
            .collect::<Result<Vec<_>>>()?;

        let current = self.slaves.read().clone();
        if current.iter().map(|s| &s.name).eq(names.iter()) {
            return Ok(false);
        }

        let mut next = Vec::with_capacity(names.len());
        let mut opened = Vec::new();
        for name in &names {
            match current.iter().find(|s| &s.name == name) {
                Some(kept) => next.push(kept.clone()),
                None => {
                    let slave = match (self.opener)(name) {
                        Ok(source) => Slave::new(name, source),
                        Err(err) => {
                            discard(&opened).await;
                            return Err(err);
                        }
                    };
                    opened.push(slave.clone());
                    next.push(slave);
                }
            }
        }

        // close() cancels before taking the list; checked under the lock.
        let published = {
            let mut slaves = self.slaves.write();
            let open = !self.cancel.is_cancelled();
            if open {
                *slaves = next;
            }
            open
        };
        if !published {
            debug!(host = self.dsn.host(), "refresh finished after close");
            discard(&opened).await;
            return Ok(false);
        }

        let removed: Vec<Slave> = current
            .into_iter()
            .filter(|s| !names.contains(&s.name))
            .collect();
        info!(
            host = self.dsn.host(),
            slaves = names.len(),
            removed = removed.len(),
            "slave list refreshed"
        );
        if let Err(err) = close_all(&removed).await {
            warn!(error = %err, "closing removed slaves failed");
        }
        Ok(true)
    }
}

async fn discard(slaves: &[Slave]) {
    if let Err(err) = close_all(slaves).await {
        warn!(error = %err, "closing unpublished slaves failed");
    }
}

#[async_trait]
impl Slaves for DnsSlaves {
    fn next(&self, _ctx: &Context) -> Result<Slave> {
        let slaves = self.inner.slaves.read();
        if slaves.is_empty() {
            return Err(Error::SlaveNotFound);
        }
        let n = self.inner.cnt.fetch_add(1, Ordering::Relaxed);
        Ok(slaves[n % slaves.len()].clone())
    }

    async fn close(&self) -> Result<()> {
        if self.inner.cancel.is_cancelled() {
            return Ok(());
        }
        self.inner.cancel.cancel();
        let slaves = std::mem::take(&mut *self.inner.slaves.write());
        close_all(&slaves).await
    }
}

impl Drop for DnsSlaves {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use parking_lot::Mutex;

    use super::*;
    use crate::mock::MockDataSource;

    #[derive(Debug, Default)]
    struct StaticResolver {
        answer: Mutex<Option<Vec<IpAddr>>>,
    }

    impl StaticResolver {
        fn set(&self, answer: Option<Vec<IpAddr>>) {
            *self.answer.lock() = answer;
        }
    }

    #[async_trait]
    impl Resolver for StaticResolver {
        async fn lookup(&self, _host: &str, _port: u16) -> Result<Vec<IpAddr>> {
            self.answer
                .lock()
                .clone()
                .ok_or_else(|| Error::Config(String::from("dns down")))
        }
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn opener(opened: Arc<Mutex<Vec<Arc<MockDataSource>>>>) -> Opener {
        Arc::new(move |dsn: &str| {
            let ds = Arc::new(MockDataSource::new(dsn));
            opened.lock().push(Arc::clone(&ds));
            Ok(ds as Arc<dyn DataSource>)
        })
    }

    #[tokio::test]
    async fn test_refresh_splices_and_swaps() {
        let resolver = Arc::new(StaticResolver::default());
        resolver.set(Some(vec![ip(2), ip(1), ip(2)]));
        let opened = Arc::new(Mutex::new(Vec::new()));
        let slaves = DnsSlaves::start(
            "root:pw@tcp(slaves.local:3306)/order_db_0",
            Duration::from_secs(3600),
            resolver.clone(),
            opener(opened.clone()),
        )
        .await
        .unwrap();
        assert_eq!(
            slaves.slave_names(),
            vec![
                "root:pw@tcp(10.0.0.1:3306)/order_db_0",
                "root:pw@tcp(10.0.0.2:3306)/order_db_0",
            ]
        );

        assert!(!slaves.refresh().await.unwrap());

        resolver.set(Some(vec![ip(2), ip(3)]));
        assert!(slaves.refresh().await.unwrap());
        assert_eq!(
            slaves.slave_names(),
            vec![
                "root:pw@tcp(10.0.0.2:3306)/order_db_0",
                "root:pw@tcp(10.0.0.3:3306)/order_db_0",
            ]
        );
        let opened = opened.lock().clone();
        assert_eq!(opened.len(), 3);
        assert!(opened[0].is_closed(), "10.0.0.1 was dropped");
        assert!(!opened[1].is_closed(), "10.0.0.2 is reused");

        slaves.close().await.unwrap();
        assert!(opened[1].is_closed());
        assert!(matches!(slaves.next(&Context::new()), Err(Error::SlaveNotFound)));
        slaves.close().await.unwrap();
    }

    /// Answers the first lookup at once and holds later ones until released.
    #[derive(Debug, Default)]
    struct GatedResolver {
        calls: AtomicUsize,
        entered: tokio::sync::Notify,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl Resolver for GatedResolver {
        async fn lookup(&self, _host: &str, _port: u16) -> Result<Vec<IpAddr>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(vec![ip(1)]);
            }
            self.entered.notify_one();
            self.gate.notified().await;
            Ok(vec![ip(2)])
        }
    }

    #[tokio::test]
    async fn test_refresh_in_flight_during_close_publishes_nothing() {
        let resolver = Arc::new(GatedResolver::default());
        let opened = Arc::new(Mutex::new(Vec::new()));
        let slaves = Arc::new(
            DnsSlaves::start(
                "root:pw@tcp(slaves.local:3306)/app",
                Duration::from_secs(3600),
                resolver.clone(),
                opener(opened.clone()),
            )
            .await
            .unwrap(),
        );

        let refreshing = tokio::spawn({
            let slaves = Arc::clone(&slaves);
            async move { slaves.refresh().await }
        });
        resolver.entered.notified().await;
        slaves.close().await.unwrap();
        assert!(slaves.slave_names().is_empty());

        resolver.gate.notify_one();
        assert!(!refreshing.await.unwrap().unwrap());
        assert!(slaves.slave_names().is_empty());

        let opened = opened.lock().clone();
        assert_eq!(opened.len(), 2);
        assert!(opened.iter().all(|ds| ds.is_closed()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_list() {
        let resolver = Arc::new(StaticResolver::default());
        resolver.set(Some(vec![ip(1)]));
        let slaves = DnsSlaves::start(
            "mysql://root:pw@slaves.local/app",
            Duration::from_secs(3600),
            resolver.clone(),
            opener(Arc::new(Mutex::new(Vec::new()))),
        )
        .await
        .unwrap();

        resolver.set(None);
        assert!(slaves.refresh().await.is_err());
        let picked = slaves.next(&Context::new()).unwrap();
        assert_eq!(picked.name, "mysql://root:pw@10.0.0.1:3306/app");
    }
}
