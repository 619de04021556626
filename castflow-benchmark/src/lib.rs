use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct RoutingMetrics {
    // Activation Stats
    pub total_activations: AtomicUsize,
    pub total_empty_activations: AtomicUsize,
    pub total_activation_time_us: AtomicU64,
    pub max_activation_time_us: AtomicU64,

    // Detailed Breakdown
    pub total_discovery_us: AtomicU64,
    pub total_pathfinding_us: AtomicU64,
    pub total_annotation_us: AtomicU64,

    // Network Shape
    pub total_conduits_discovered: AtomicUsize,
    pub total_sinks_routed: AtomicUsize,
    pub total_sinks_filtered: AtomicUsize,
    pub total_path_hops: AtomicUsize,

    // Link Maintenance
    pub total_break_notifications: AtomicUsize,
    pub total_conduits_cleared: AtomicUsize,
    pub total_integrity_checks: AtomicUsize,
    pub total_broken_links_found: AtomicUsize,

    // Sinks
    pub total_sink_ticks: AtomicUsize,
    pub total_fluid_drawn: AtomicU64,
    pub total_casts_solidified: AtomicUsize,

    // Storage Stats
    pub total_state_loads: AtomicUsize,
    pub total_load_time_us: AtomicU64,
    pub total_state_saves: AtomicUsize,
    pub total_save_time_us: AtomicU64,
    pub total_bytes_raw: AtomicUsize,
    pub total_bytes_compressed: AtomicUsize,

    // Session
    pub start_time: Option<Instant>,
    pub config_summary: String,
}

impl RoutingMetrics {
    pub fn new(config_summary: String) -> Self {
        Self {
            start_time: Some(Instant::now()),
            config_summary,
            ..Default::default()
        }
    }

    pub fn record_activation(&self, duration: Duration) {
        self.total_activations.fetch_add(1, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_activation_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_activation_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_empty_activation(&self) {
        self.total_empty_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discovery(&self, duration: Duration, conduits: usize) {
        self.total_discovery_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.total_conduits_discovered.fetch_add(conduits, Ordering::Relaxed);
    }

    pub fn record_pathfinding(&self, duration: Duration, hops: usize) {
        self.total_pathfinding_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.total_path_hops.fetch_add(hops, Ordering::Relaxed);
    }

    pub fn record_annotation(&self, duration: Duration) {
        self.total_annotation_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_sinks(&self, routed: usize, filtered: usize) {
        self.total_sinks_routed.fetch_add(routed, Ordering::Relaxed);
        self.total_sinks_filtered.fetch_add(filtered, Ordering::Relaxed);
    }

    pub fn record_break_notification(&self, conduits_cleared: usize) {
        self.total_break_notifications.fetch_add(1, Ordering::Relaxed);
        self.total_conduits_cleared.fetch_add(conduits_cleared, Ordering::Relaxed);
    }

    pub fn record_integrity_check(&self, broken: bool) {
        self.total_integrity_checks.fetch_add(1, Ordering::Relaxed);
        if broken {
            self.total_broken_links_found.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_sink_tick(&self) {
        self.total_sink_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fluid_drawn(&self, amount: u64) {
        self.total_fluid_drawn.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn record_cast(&self) {
        self.total_casts_solidified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self, duration: Duration) {
        self.total_state_loads.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_save(&self, duration: Duration) {
        self.total_state_saves.fetch_add(1, Ordering::Relaxed);
        self.total_save_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_state_sizes(&self, raw: usize, compressed: usize) {
        self.total_bytes_raw.fetch_add(raw, Ordering::Relaxed);
        self.total_bytes_compressed.fetch_add(compressed, Ordering::Relaxed);
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();
        let activations = self.total_activations.load(Ordering::Relaxed);
        let empty = self.total_empty_activations.load(Ordering::Relaxed);
        let act_time_total =
            self.total_activation_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let act_max = self.max_activation_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let act_avg = if activations > 0 { act_time_total / activations as f64 } else { 0.0 };

        // Granular stats
        let discovery_time = self.total_discovery_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let path_time = self.total_pathfinding_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let annotation_time = self.total_annotation_us.load(Ordering::Relaxed) as f64 / 1000.0;

        let discovery_avg = if activations > 0 { discovery_time / activations as f64 } else { 0.0 };
        let path_avg = if activations > 0 { path_time / activations as f64 } else { 0.0 };
        let annotation_avg =
            if activations > 0 { annotation_time / activations as f64 } else { 0.0 };

        let conduits = self.total_conduits_discovered.load(Ordering::Relaxed);
        let routed = self.total_sinks_routed.load(Ordering::Relaxed);
        let filtered = self.total_sinks_filtered.load(Ordering::Relaxed);
        let hops = self.total_path_hops.load(Ordering::Relaxed);
        let avg_hops = if routed > 0 { hops as f64 / routed as f64 } else { 0.0 };

        let notifications = self.total_break_notifications.load(Ordering::Relaxed);
        let cleared = self.total_conduits_cleared.load(Ordering::Relaxed);
        let checks = self.total_integrity_checks.load(Ordering::Relaxed);
        let broken = self.total_broken_links_found.load(Ordering::Relaxed);
        let broken_rate = if checks > 0 { (broken as f64 / checks as f64) * 100.0 } else { 0.0 };

        let sink_ticks = self.total_sink_ticks.load(Ordering::Relaxed);
        let drawn = self.total_fluid_drawn.load(Ordering::Relaxed);
        let casts = self.total_casts_solidified.load(Ordering::Relaxed);

        let loaded = self.total_state_loads.load(Ordering::Relaxed);
        let load_time = self.total_load_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let load_avg = if loaded > 0 { load_time / loaded as f64 } else { 0.0 };

        let saved = self.total_state_saves.load(Ordering::Relaxed);
        let save_time = self.total_save_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let save_avg = if saved > 0 { save_time / saved as f64 } else { 0.0 };

        let raw = self.total_bytes_raw.load(Ordering::Relaxed);
        let compressed = self.total_bytes_compressed.load(Ordering::Relaxed);
        let compression_ratio = if compressed > 0 { raw as f64 / compressed as f64 } else { 0.0 };

        format!(
            "Castflow Routing Report\n\
             =======================\n\
             Configuration: {}\n\
             Session Duration: {:.2?}\n\n\
             [Activations]\n\
             Activations: {} ({} without flow)\n\
             Total Time: {:.2} ms\n\
             Avg Time: {:.2} ms/activation\n\
             Max Time: {:.2} ms\n\
               - Discovery: {:.2} ms\n\
               - Pathfinding: {:.2} ms\n\
               - Annotation: {:.2} ms\n\n\
             [Network]\n\
             Conduits Discovered: {}\n\
             Sinks Routed: {}\n\
             Sinks Filtered: {}\n\
             Avg Path Length: {:.1} hops\n\n\
             [Links]\n\
             Break Notifications: {}\n\
             Conduits Cleared: {}\n\
             Integrity Checks: {}\n\
             Broken: {} ({:.1}%)\n\n\
             [Sinks]\n\
             Ticks: {}\n\
             Fluid Drawn: {} mB\n\
             Casts Solidified: {}\n\n\
             [Storage]\n\
             Loads: {} (avg {:.2} ms)\n\
             Saves: {} (avg {:.2} ms)\n\
             Compression Ratio: {:.2}x ({} B -> {} B)\n",
            self.config_summary,
            uptime,
            activations, empty, act_time_total, act_avg, act_max,
            discovery_avg, path_avg, annotation_avg,
            conduits, routed, filtered, avg_hops,
            notifications, cleared, checks, broken, broken_rate,
            sink_ticks, drawn, casts,
            loaded, load_avg, saved, save_avg,
            compression_ratio, raw, compressed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_max() {
        let metrics = RoutingMetrics::new("test".to_string());
        metrics.record_activation(Duration::from_micros(40));
        metrics.record_activation(Duration::from_micros(90));
        metrics.record_activation(Duration::from_micros(10));
        assert_eq!(metrics.total_activations.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.max_activation_time_us.load(Ordering::Relaxed), 90);
        assert_eq!(metrics.total_activation_time_us.load(Ordering::Relaxed), 140);
    }

    #[test]
    fn test_report_mentions_counts() {
        let metrics = RoutingMetrics::new("max_drop=255".to_string());
        metrics.record_sinks(3, 1);
        metrics.record_integrity_check(true);
        metrics.record_integrity_check(false);
        let report = metrics.generate_report();
        assert!(report.contains("Configuration: max_drop=255"));
        assert!(report.contains("Sinks Routed: 3"));
        assert!(report.contains("Sinks Filtered: 1"));
        assert!(report.contains("Broken: 1 (50.0%)"));
    }
}
