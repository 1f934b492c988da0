//! The quorum node: wires the validator registry, the vote pool and the
//! gossip reconciler together.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use quorum_consensus::{Committee, ValidatorRegistry, VotePool};
use quorum_network::{GossipReconciler, PullRequest, PushTracker};
use quorum_store::MetaStore;
use quorum_store_lmdb::LmdbEnvironment;
use quorum_types::{Address, EntryType, Round, Seed, Step};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::vote_holder::VoteEntryHolder;

pub struct QuorumNode {
    config: NodeConfig,
    registry: Arc<ValidatorRegistry>,
    pool: Arc<VotePool>,
    tracker: Arc<PushTracker>,
    reconciler: Arc<GossipReconciler>,
    metrics: NodeMetrics,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl QuorumNode {
    /// Open the LMDB environment under `config.data_dir` and build the node.
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        let env = LmdbEnvironment::open_default(&config.data_dir)?;
        tracing::info!(data_dir = %config.data_dir.display(), "opened validator store");
        Self::with_store(config, Arc::new(env.meta_store()))
    }

    /// Build the node on top of an existing metadata store.
    pub fn with_store(config: NodeConfig, store: Arc<dyn MetaStore>) -> Result<Self, NodeError> {
        let registry = Arc::new(ValidatorRegistry::load(store)?);
        let pool = Arc::new(VotePool::with_known_capacity(
            Arc::clone(&registry),
            config.votes.known_hash_capacity,
        ));
        let tracker = Arc::new(PushTracker::new(config.votes.push_tracker_config()));
        let vote_holder = Arc::new(VoteEntryHolder::new(
            Arc::clone(&pool),
            Arc::clone(&tracker),
            config.votes.max_parallel_pulls,
        ));

        let reconciler = GossipReconciler::builder(config.gossip.reconciler_config())
            .register(EntryType::Vote, vote_holder)
            .build(&config.gossip.required_categories)?;

        let metrics = NodeMetrics::new()?;
        metrics
            .validator_count
            .set(i64::try_from(registry.count()).unwrap_or(i64::MAX));

        tracing::info!(
            validators = registry.count(),
            known_hash_capacity = config.votes.known_hash_capacity,
            max_parallel_pulls = config.votes.max_parallel_pulls,
            "quorum node initialised"
        );

        Ok(Self {
            config,
            registry,
            pool,
            tracker,
            reconciler: Arc::new(reconciler),
            metrics,
            tasks: Vec::new(),
            started: false,
        })
    }

    /// Spawn the background tasks: pull retry loops, the pending-push
    /// sweeper and the push tracker tick. Requires a tokio runtime.
    pub fn start(&mut self) -> Result<(), NodeError> {
        if self.started {
            return Err(NodeError::AlreadyStarted);
        }
        let mut tasks = self.reconciler.run()?;
        tasks.push(self.tracker.spawn(self.config.votes.pull_timeout()));
        self.tasks = tasks;
        self.started = true;
        tracing::info!(tasks = self.tasks.len(), "quorum node started");
        Ok(())
    }

    /// Abort the background tasks.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        tracing::info!("quorum node stopped");
    }

    pub fn add_validator(&self, addr: Address) -> Result<bool, NodeError> {
        let added = self.registry.add_validator(addr)?;
        if added {
            self.metrics
                .validator_count
                .set(i64::try_from(self.registry.count()).unwrap_or(i64::MAX));
        }
        Ok(added)
    }

    pub fn sample_committee(
        &self,
        seed: &Seed,
        round: Round,
        step: Step,
        limit: usize,
    ) -> Result<Committee, NodeError> {
        Ok(self.registry.sample_committee(seed, round, step, limit)?)
    }

    /// Finalize `round`: its votes and everything older are dropped.
    pub fn complete_round(&self, round: Round) {
        self.pool.complete_round(round);
    }

    /// The outbound pull-request stream, for the transport. Handed out once.
    pub fn take_requests(&self) -> Option<mpsc::Receiver<PullRequest>> {
        self.reconciler.take_requests()
    }

    pub fn refresh_metrics(&self) {
        self.metrics
            .refresh(&self.pool, &self.reconciler, &self.tracker);
        self.metrics
            .validator_count
            .set(i64::try_from(self.registry.count()).unwrap_or(i64::MAX));
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<VotePool> {
        &self.pool
    }

    pub fn reconciler(&self) -> &Arc<GossipReconciler> {
        &self.reconciler
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }
}

impl Drop for QuorumNode {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_consensus::{Vote, VoteHeader};
    use quorum_network::AnnounceOutcome;
    use quorum_nullables::NullMetaStore;
    use quorum_types::{Hash, PeerId, PushPullKey};

    fn node() -> QuorumNode {
        QuorumNode::with_store(NodeConfig::default(), Arc::new(NullMetaStore::new())).unwrap()
    }

    fn vote(round: Round, voter: Address) -> Vote {
        Vote::new(
            VoteHeader {
                round,
                step: 0,
                voted_hash: Hash::new([0x11; 32]),
            },
            voter,
            vec![0xAB],
        )
    }

    #[test]
    fn missing_required_category_fails_startup() {
        let mut config = NodeConfig::default();
        config.gossip.required_categories = vec![EntryType::Vote, EntryType::Block];
        let result = QuorumNode::with_store(config, Arc::new(NullMetaStore::new()));
        assert!(matches!(result, Err(NodeError::Network(_))));
    }

    #[test]
    fn announced_vote_is_pulled_then_stored() {
        let node = node();
        let mut requests = node.take_requests().unwrap();
        let v = vote(1, Address::new([1; 20]));
        let key = PushPullKey::new(EntryType::Vote, v.hash());

        assert_eq!(
            node.reconciler().announce(&PeerId::from("p1"), key),
            Ok(AnnounceOutcome::Requested)
        );
        let request = requests.try_recv().unwrap();
        assert_eq!(request.key, key);

        let payload = v.to_bytes().unwrap();
        assert_eq!(node.reconciler().store_entry(key, payload, 0, false), Ok(true));
        assert_eq!(
            node.reconciler().announce(&PeerId::from("p2"), key),
            Ok(AnnounceOutcome::AlreadyStored)
        );
        assert_eq!(node.pool().votes_for_round(1).len(), 1);

        node.complete_round(1);
        assert!(node.pool().votes_for_round(1).is_empty());
    }

    #[test]
    fn committee_follows_registered_validators() {
        let node = node();
        for b in 1..=5u8 {
            assert!(node.add_validator(Address::new([b; 20])).unwrap());
        }
        assert!(!node.add_validator(Address::new([1; 20])).unwrap());
        assert_eq!(node.metrics().validator_count.get(), 5);

        let seed = Seed::new([3; 32]);
        let committee = node.sample_committee(&seed, 4, 1, 2).unwrap();
        assert_eq!(committee.len(), 2);
        assert!(committee.iter().all(|a| node.registry().contains(a)));
        assert!(matches!(
            node.sample_committee(&seed, 4, 1, 6),
            Err(NodeError::Consensus(_))
        ));
    }

    #[test]
    fn metrics_refresh_reflects_pool() {
        let node = node();
        let v = vote(2, Address::new([2; 20]));
        node.pool().submit(v);
        node.refresh_metrics();
        assert_eq!(node.metrics().votes_pooled.get(), 1);
        assert_eq!(
            node.metrics()
                .vote_events
                .with_label_values(&["accepted"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn start_is_not_repeatable() {
        let mut node = node();
        node.start().unwrap();
        assert!(matches!(node.start(), Err(NodeError::AlreadyStarted)));
        node.stop();
    }
}
