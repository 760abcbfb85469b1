//! # Property-Based Tests
//!
//! Settlement invariants over randomized rates and capacities.
//!
//! Expected values are only asserted where the protocol computes them with
//! the same float operations (so exact equality is well-defined); bound
//! invariants hold by construction for any input.

use fluxline_core::Network;
use proptest::prelude::*;

proptest! {
    /// A single chain delivers exactly min(source rate, link cap, sink cap).
    #[test]
    fn chain_delivers_the_tightest_constraint(
        rate in 0.0f64..1000.0,
        link_cap in 0.0f64..1000.0,
        sink_cap in 0.0f64..1000.0,
    ) {
        let mut net = Network::new();
        let source = net.add_source(rate);
        let sink = net.add_sink_capped(sink_cap);
        net.connect(source, sink, link_cap).expect("connect");

        net.simulate_all();

        let delivered = net.input_rate(sink).expect("sink intake");
        prop_assert_eq!(delivered, rate.min(link_cap).min(sink_cap));
    }

    /// Unbounded branches each settle at input / branch count.
    #[test]
    fn splitter_splits_evenly_across_unbounded_sinks(
        rate in 0.0f64..450.0,
        branches in 1usize..=3,
    ) {
        let mut net = Network::new();
        let source = net.add_source(rate);
        let splitter = net.add_splitter();
        net.connect_default(source, splitter).expect("connect");

        let sinks: Vec<_> = (0..branches)
            .map(|_| {
                let sink = net.add_sink();
                net.connect_default(splitter, sink).expect("connect");
                sink
            })
            .collect();

        net.simulate_all();

        let share = rate / branches as f64;
        for sink in sinks {
            prop_assert_eq!(net.input_rate(sink).expect("sink intake"), share);
        }
    }

    /// The merger's outgoing speed equals the sum of its incoming speeds,
    /// whatever backpressure the sink applied.
    ///
    /// Integer-valued rates keep every negotiation step exact (the two-input
    /// fair-share only ever halves), so conservation holds to the bit.
    #[test]
    fn merger_conserves_flow(
        rate in 0u32..450,
        rate2 in 0u32..450,
        sink_cap in 0u32..900,
    ) {
        let mut net = Network::new();
        let source = net.add_source(f64::from(rate));
        let source2 = net.add_source(f64::from(rate2));
        let merger = net.add_merger();
        let sink = net.add_sink_capped(f64::from(sink_cap));
        net.connect_default(source, merger).expect("connect");
        net.connect_default(source2, merger).expect("connect");
        net.connect_default(merger, sink).expect("connect");

        net.simulate_all();

        prop_assert_eq!(
            net.input_rate(merger).expect("merger input"),
            net.output_rate(merger).expect("merger output")
        );
    }

    /// At rest every link sits inside [0, effective ceiling].
    #[test]
    fn settled_links_respect_their_ceilings(
        rate in 0.0f64..1000.0,
        link_cap in 1.0f64..1000.0,
        sink_cap in 0.0f64..1000.0,
        sink_cap2 in 0.0f64..1000.0,
    ) {
        let mut net = Network::new();
        let source = net.add_source(rate);
        let splitter = net.add_splitter();
        let sink = net.add_sink_capped(sink_cap);
        let sink2 = net.add_sink_capped(sink_cap2);
        net.connect(source, splitter, link_cap).expect("connect");
        net.connect_default(splitter, sink).expect("connect");
        net.connect_default(splitter, sink2).expect("connect");

        net.simulate_all();

        for link in net.links() {
            prop_assert!(link.speed() >= 0.0);
            prop_assert!(link.speed() <= link.effective_ceiling());
        }
    }

    /// Simulating an already-settled graph is a no-op.
    #[test]
    fn settlement_is_idempotent(
        rate in 0.0f64..1000.0,
        rate2 in 0.0f64..1000.0,
        sink_cap in 0.0f64..1000.0,
    ) {
        let mut net = Network::new();
        let source = net.add_source(rate);
        let source2 = net.add_source(rate2);
        let merger = net.add_merger();
        let sink = net.add_sink_capped(sink_cap);
        net.connect_default(source, merger).expect("connect");
        net.connect_default(source2, merger).expect("connect");
        net.connect_default(merger, sink).expect("connect");

        net.simulate_all();
        let settled: Vec<f64> = net.links().map(|l| l.speed()).collect();

        net.simulate_all();
        let resettled: Vec<f64> = net.links().map(|l| l.speed()).collect();
        prop_assert_eq!(settled, resettled);
    }

    /// Reset restores every link to rest, and a re-run reproduces the same
    /// settlement from scratch.
    #[test]
    fn reset_restores_rest_state(
        rate in 0.0f64..1000.0,
        sink_cap in 0.0f64..1000.0,
    ) {
        let mut net = Network::new();
        let source = net.add_source(rate);
        let splitter = net.add_splitter();
        let sink = net.add_sink_capped(sink_cap);
        let sink2 = net.add_sink();
        net.connect_default(source, splitter).expect("connect");
        net.connect_default(splitter, sink).expect("connect");
        net.connect_default(splitter, sink2).expect("connect");

        net.simulate_all();
        let settled: Vec<f64> = net.links().map(|l| l.speed()).collect();

        net.reset_all();
        for link in net.links() {
            prop_assert_eq!(link.speed(), 0.0);
            prop_assert!(!link.is_backpressured());
        }

        net.simulate_all();
        let resettled: Vec<f64> = net.links().map(|l| l.speed()).collect();
        prop_assert_eq!(settled, resettled);
    }
}
