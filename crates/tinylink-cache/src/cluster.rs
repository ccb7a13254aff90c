//! A Redis cluster client that routes each key to the node owning its slot.
//!
//! The slot map starts empty and is learned from `MOVED` replies: a command
//! for an unmapped slot goes to a seed node, which either serves it or names
//! the owner. `ASK` replies redirect a single command without touching the
//! map. Every redirect counts against the configured [`RetryPolicy`]; once it
//! is spent the call fails with [`CacheError::RedirectionsExhausted`].
//!
//! A node that stops answering is dropped together with the slots mapped to
//! it, so the next command reconnects instead of reusing a dead handle.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tinylink_core::{CacheError, RetryPolicy, ShortCode};
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

use crate::redis::{map_redis_error, open_connection};
use crate::{ttl_seconds, Result, UrlCache, DEFAULT_KEY_PREFIX};

/// Number of hash slots in a Redis cluster.
pub const SLOT_COUNT: u16 = 16384;

/// Computes the cluster slot of `key`, honouring `{hash tags}`.
pub fn key_slot(key: &[u8]) -> u16 {
    let hashed = hash_tag(key).unwrap_or(key);
    crc16::State::<crc16::XMODEM>::calculate(hashed) % SLOT_COUNT
}

fn hash_tag(key: &[u8]) -> Option<&[u8]> {
    let open = key.iter().position(|&b| b == b'{')?;
    let close = key[open + 1..].iter().position(|&b| b == b'}')?;
    // `{}` hashes the whole key
    (close > 0).then(|| &key[open + 1..open + 1 + close])
}

/// A single command the cache sends to a cluster node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    Get { key: String },
    SetEx { key: String, value: String, seconds: u64 },
    Del { key: String },
}

impl CacheCommand {
    pub fn key(&self) -> &str {
        match self {
            CacheCommand::Get { key }
            | CacheCommand::SetEx { key, .. }
            | CacheCommand::Del { key } => key,
        }
    }

    fn to_cmd(&self) -> redis::Cmd {
        match self {
            CacheCommand::Get { key } => {
                let mut cmd = redis::cmd("GET");
                cmd.arg(key);
                cmd
            }
            CacheCommand::SetEx {
                key,
                value,
                seconds,
            } => {
                let mut cmd = redis::cmd("SETEX");
                cmd.arg(key).arg(*seconds).arg(value);
                cmd
            }
            CacheCommand::Del { key } => {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(key);
                cmd
            }
        }
    }
}

/// Where a node told us to send a command instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// The slot has permanently moved to `addr`.
    Moved { slot: u16, addr: String },
    /// Resend this one command to `addr`, preceded by `ASKING`.
    Ask { slot: u16, addr: String },
}

impl Redirect {
    /// Parses a `MOVED <slot> <host:port>` or `ASK <slot> <host:port>` error
    /// message. Surrounding text and punctuation added by client libraries
    /// are ignored.
    pub fn parse(message: &str) -> Option<Self> {
        let mut tokens = message
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| c == ':' || c == ',' || c == '"'));

        while let Some(token) = tokens.next() {
            let moved = token.eq_ignore_ascii_case("moved");
            if !moved && !token.eq_ignore_ascii_case("ask") {
                continue;
            }
            let slot = tokens.next()?.parse::<u16>().ok()?;
            let addr = tokens.next()?;
            if slot >= SLOT_COUNT || !addr.contains(':') {
                return None;
            }
            let addr = addr.to_string();
            return Some(if moved {
                Redirect::Moved { slot, addr }
            } else {
                Redirect::Ask { slot, addr }
            });
        }
        None
    }

    /// Builds a redirect from an error code (`MOVED` or `ASK`) and the
    /// `(addr, slot)` pair the client library extracted from the reply.
    pub fn from_reply(code: Option<&str>, node: Option<(&str, u16)>) -> Option<Self> {
        let (addr, slot) = node?;
        if slot >= SLOT_COUNT {
            return None;
        }
        let addr = addr.to_string();
        match code? {
            c if c.eq_ignore_ascii_case("moved") => Some(Redirect::Moved { slot, addr }),
            c if c.eq_ignore_ascii_case("ask") => Some(Redirect::Ask { slot, addr }),
            _ => None,
        }
    }

    fn from_error(err: &redis::RedisError) -> Option<Self> {
        Self::from_reply(err.code(), err.redirect_node())
            .or_else(|| Self::parse(&err.to_string()))
    }

    fn addr(&self) -> &str {
        match self {
            Redirect::Moved { addr, .. } | Redirect::Ask { addr, .. } => addr,
        }
    }
}

/// Why a node did not serve a command.
#[derive(Debug, Clone)]
pub enum NodeFailure {
    Redirected(Redirect),
    Failed(CacheError),
}

impl From<CacheError> for NodeFailure {
    fn from(value: CacheError) -> Self {
        NodeFailure::Failed(value)
    }
}

/// One node of the cluster.
#[async_trait]
pub trait ClusterNode: Send + Sync + 'static {
    /// Executes `command`, returning the string reply of `GET` (and `None`
    /// for every other command). When `asking` is set the command must be
    /// preceded by `ASKING` on the same connection.
    async fn execute(
        &self,
        command: &CacheCommand,
        asking: bool,
    ) -> std::result::Result<Option<String>, NodeFailure>;
}

/// Opens connections to cluster nodes by address.
#[async_trait]
pub trait NodeConnector: Send + Sync + 'static {
    type Node: ClusterNode;

    async fn connect(&self, addr: &str) -> Result<Self::Node>;
}

/// Settings for a Redis cluster cache.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ClusterConfig {
    /// Seed nodes as `host:port`.
    pub nodes: Vec<String>,
    #[builder(default, setter(strip_option, into))]
    pub password: Option<String>,
    #[builder(default = DEFAULT_KEY_PREFIX.to_string(), setter(into))]
    pub key_prefix: String,
    /// Bounds the number of redirects followed per command.
    #[builder(default = RetryPolicy::redirections())]
    pub redirects: RetryPolicy,
    #[builder(default = Duration::from_secs(5))]
    pub connect_timeout: Duration,
    #[builder(default = Duration::from_secs(3))]
    pub command_timeout: Duration,
}

/// A [`UrlCache`] over a partitioned cluster.
pub struct ClusterUrlCache<C: NodeConnector> {
    connector: C,
    seeds: Vec<String>,
    key_prefix: String,
    redirects: RetryPolicy,
    slots: RwLock<HashMap<u16, String>>,
    nodes: RwLock<HashMap<String, Arc<C::Node>>>,
}

impl ClusterUrlCache<RedisNodeConnector> {
    /// Connects to the cluster described by `config`.
    ///
    /// Fails with [`CacheError::Initialization`] if no seed node answers.
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        let connector = RedisNodeConnector {
            password: config.password.clone(),
            connect_timeout: config.connect_timeout,
            command_timeout: config.command_timeout,
        };
        let cache = Self::with_connector(config, connector);
        cache.any_seed().await.map_err(|e| {
            CacheError::Initialization(format!("no reachable seed node: {e}"))
        })?;
        Ok(cache)
    }
}

impl<C: NodeConnector> ClusterUrlCache<C> {
    /// Builds a cache that opens node connections lazily through `connector`.
    pub fn with_connector(config: &ClusterConfig, connector: C) -> Self {
        Self {
            connector,
            seeds: config.nodes.clone(),
            key_prefix: config.key_prefix.clone(),
            redirects: config.redirects,
            slots: RwLock::new(HashMap::new()),
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// The node address currently mapped to `slot`, if any.
    pub fn slot_owner(&self, slot: u16) -> Option<String> {
        self.slots.read().get(&slot).cloned()
    }

    fn cache_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.key_prefix, code.as_str())
    }

    async fn node(&self, addr: &str) -> Result<Arc<C::Node>> {
        let cached = self.nodes.read().get(addr).cloned();
        if let Some(node) = cached {
            return Ok(node);
        }
        let node = Arc::new(self.connector.connect(addr).await?);
        debug!(addr, "connected to cluster node");
        let mut nodes = self.nodes.write();
        Ok(Arc::clone(nodes.entry(addr.to_string()).or_insert(node)))
    }

    /// Drops the connection to `addr` and every slot mapped to it.
    fn forget(&self, addr: &str) {
        let dropped = self.nodes.write().remove(addr).is_some();
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, owner| owner != addr);
        debug!(
            addr,
            dropped,
            unmapped = before - slots.len(),
            "forgot unreachable cluster node"
        );
    }

    /// Returns the first seed that accepts a connection.
    async fn any_seed(&self) -> Result<(String, Arc<C::Node>)> {
        let mut last_error = CacheError::Unavailable("no seed nodes configured".to_string());
        for seed in &self.seeds {
            match self.node(seed).await {
                Ok(node) => return Ok((seed.clone(), node)),
                Err(e) => {
                    warn!(addr = %seed, error = %e, "seed node unreachable");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn route(&self, slot: u16) -> Result<(String, Arc<C::Node>)> {
        match self.slot_owner(slot) {
            Some(addr) => {
                let node = self.node(&addr).await?;
                Ok((addr, node))
            }
            None => self.any_seed().await,
        }
    }

    /// Sends `command` to the owner of its slot, following redirects.
    pub async fn execute(&self, command: CacheCommand) -> Result<Option<String>> {
        let slot = key_slot(command.key().as_bytes());
        let (mut addr, mut node) = self.route(slot).await?;
        let mut asking = false;
        let mut redirections = 0u32;

        loop {
            let redirect = match node.execute(&command, asking).await {
                Ok(reply) => return Ok(reply),
                Err(NodeFailure::Failed(e)) => {
                    if e.is_unavailable() {
                        warn!(addr = %addr, error = %e, "cluster node unreachable");
                        self.forget(&addr);
                    }
                    return Err(e);
                }
                Err(NodeFailure::Redirected(redirect)) => redirect,
            };

            if redirections >= self.redirects.max_attempts {
                warn!(
                    key = command.key(),
                    redirections, "giving up after too many cluster redirections"
                );
                return Err(CacheError::RedirectionsExhausted {
                    key: command.key().to_string(),
                    redirections,
                });
            }

            trace!(from = %addr, to = redirect.addr(), ?redirect, "following cluster redirect");
            if redirections > 0 {
                self.redirects.wait(redirections - 1).await;
            }
            redirections += 1;

            asking = matches!(redirect, Redirect::Ask { .. });
            if let Redirect::Moved { slot, addr } = &redirect {
                self.slots.write().insert(*slot, addr.clone());
            }
            addr = redirect.addr().to_string();
            node = self.node(&addr).await?;
        }
    }
}

#[async_trait]
impl<C: NodeConnector> UrlCache for ClusterUrlCache<C> {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        let key = self.cache_key(code);
        let hit = self.execute(CacheCommand::Get { key }).await?;
        trace!(code = %code, hit = hit.is_some(), "cluster lookup");
        Ok(hit)
    }

    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Duration) -> Result<()> {
        let key = self.cache_key(code);
        self.execute(CacheCommand::SetEx {
            key,
            value: long_url.to_string(),
            seconds: ttl_seconds(ttl),
        })
        .await?;
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.cache_key(code);
        self.execute(CacheCommand::Del { key }).await?;
        Ok(())
    }

    async fn close(&self) {
        self.nodes.write().clear();
        self.slots.write().clear();
    }
}

/// Connects to real Redis cluster nodes.
#[derive(Debug, Clone)]
pub struct RedisNodeConnector {
    password: Option<String>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

#[async_trait]
impl NodeConnector for RedisNodeConnector {
    type Node = RedisClusterNode;

    async fn connect(&self, addr: &str) -> Result<RedisClusterNode> {
        let url = node_url(addr, self.password.as_deref());
        let conn = open_connection(&url, self.connect_timeout).await?;
        Ok(RedisClusterNode {
            conn,
            command_timeout: self.command_timeout,
        })
    }
}

/// `redis://` URL for a node, with the password percent-encoded.
fn node_url(addr: &str, password: Option<&str>) -> String {
    match password {
        Some(password) => format!("redis://:{}@{addr}", urlencoding::encode(password)),
        None => format!("redis://{addr}"),
    }
}

/// A managed connection to one cluster node.
#[derive(Clone)]
pub struct RedisClusterNode {
    conn: redis::aio::ConnectionManager,
    command_timeout: Duration,
}

impl RedisClusterNode {
    async fn query(&self, command: &CacheCommand, asking: bool) -> redis::RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        let cmd = command.to_cmd();
        let is_get = matches!(command, CacheCommand::Get { .. });

        if asking {
            let mut pipe = redis::pipe();
            pipe.cmd("ASKING").ignore().add_command(cmd);
            if is_get {
                let (reply,): (Option<String>,) = pipe.query_async(&mut conn).await?;
                return Ok(reply);
            }
            pipe.query_async::<()>(&mut conn).await?;
            return Ok(None);
        }

        if is_get {
            cmd.query_async::<Option<String>>(&mut conn).await
        } else {
            cmd.query_async::<()>(&mut conn).await?;
            Ok(None)
        }
    }
}

#[async_trait]
impl ClusterNode for RedisClusterNode {
    async fn execute(
        &self,
        command: &CacheCommand,
        asking: bool,
    ) -> std::result::Result<Option<String>, NodeFailure> {
        let outcome = tokio::time::timeout(self.command_timeout, self.query(command, asking)).await;
        match outcome {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => match Redirect::from_error(&err) {
                Some(redirect) => Err(NodeFailure::Redirected(redirect)),
                None => Err(map_redis_error("cluster command failed", err).into()),
            },
            Err(_) => Err(CacheError::Timeout(format!(
                "cluster command on '{}': no reply within {}ms",
                command.key(),
                self.command_timeout.as_millis()
            ))
            .into()),
        }
    }
}
