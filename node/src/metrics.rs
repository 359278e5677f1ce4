//! Prometheus metrics for the ledger node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; an embedder can encode it
//! into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

use tessera_ledger::LedgerState;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks appended to the ledger.
    pub blocks_parsed: IntCounter,
    /// Token transactions recorded, whatever their final type.
    pub txs_classified: IntCounter,
    /// Reorg recoveries started.
    pub reorgs: IntCounter,
    /// Recovery attempts, including the ones that gave up.
    pub reorg_attempts: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub chain_height: IntGauge,
    pub unspent_outputs: IntGauge,
    pub cycles: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent parsing one block, in milliseconds.
    pub block_parse_time_ms: Histogram,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let blocks_parsed = register_int_counter_with_registry!(
            Opts::new("tessera_blocks_parsed_total", "Blocks appended to the ledger"),
            registry
        )
        .expect("failed to register blocks_parsed counter");

        let txs_classified = register_int_counter_with_registry!(
            Opts::new(
                "tessera_txs_classified_total",
                "Token transactions recorded by the parser"
            ),
            registry
        )
        .expect("failed to register txs_classified counter");

        let reorgs = register_int_counter_with_registry!(
            Opts::new("tessera_reorgs_total", "Reorg recoveries started"),
            registry
        )
        .expect("failed to register reorgs counter");

        let reorg_attempts = register_int_counter_with_registry!(
            Opts::new(
                "tessera_reorg_attempts_total",
                "Reorg recovery attempts"
            ),
            registry
        )
        .expect("failed to register reorg_attempts counter");

        let chain_height = register_int_gauge_with_registry!(
            Opts::new("tessera_chain_height", "Height of the last parsed block"),
            registry
        )
        .expect("failed to register chain_height gauge");

        let unspent_outputs = register_int_gauge_with_registry!(
            Opts::new("tessera_unspent_outputs", "Unspent token outputs"),
            registry
        )
        .expect("failed to register unspent_outputs gauge");

        let cycles = register_int_gauge_with_registry!(
            Opts::new("tessera_cycles", "Governance cycles known to the ledger"),
            registry
        )
        .expect("failed to register cycles gauge");

        // 0.1 ms to ~1.6 s.
        let block_parse_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "tessera_block_parse_time_ms",
                "Block parse time in milliseconds"
            )
            .buckets(
                prometheus::exponential_buckets(0.1, 2.0, 15)
                    .expect("static bucket layout is valid")
            ),
            registry
        )
        .expect("failed to register block_parse_time_ms histogram");

        Self {
            registry,
            blocks_parsed,
            txs_classified,
            reorgs,
            reorg_attempts,
            chain_height,
            unspent_outputs,
            cycles,
            block_parse_time_ms,
        }
    }

    /// Refresh the gauges from the current ledger.
    pub fn observe_ledger(&self, state: &LedgerState) {
        self.chain_height.set(i64::from(state.chain_height()));
        self.unspent_outputs
            .set(state.unspent_outputs().len() as i64);
        self.cycles.set(state.cycles().len() as i64);
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
