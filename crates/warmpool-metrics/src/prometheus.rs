//! Prometheus text exposition format.

use crate::collector::MetricsSnapshot;

/// Render a snapshot as Prometheus counters.
pub fn render_prometheus(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();

    counter(
        &mut out,
        "warmpool_notifications_received_total",
        "Lifecycle notifications received.",
        snapshot.received,
    );
    counter(
        &mut out,
        "warmpool_notifications_rejected_total",
        "Notifications rejected by the filter.",
        snapshot.rejected,
    );
    counter(
        &mut out,
        "warmpool_notifications_admitted_total",
        "Notifications admitted as promotions.",
        snapshot.admitted,
    );
    counter(
        &mut out,
        "warmpool_notifications_malformed_total",
        "Admitted notifications missing a required field.",
        snapshot.malformed,
    );

    out.push_str("# HELP warmpool_completions_total Lifecycle actions completed, by outcome.\n");
    out.push_str("# TYPE warmpool_completions_total counter\n");
    out.push_str(&format!(
        "warmpool_completions_total{{outcome=\"continued\"}} {}\n",
        snapshot.completed
    ));
    out.push_str(&format!(
        "warmpool_completions_total{{outcome=\"already_completed\"}} {}\n",
        snapshot.already_completed
    ));

    counter(
        &mut out,
        "warmpool_dispatch_retries_total",
        "Completion calls retried after a transient failure.",
        snapshot.retried,
    );

    out.push_str("# HELP warmpool_dispatch_failures_total Invocations that ended failed, by cause.\n");
    out.push_str("# TYPE warmpool_dispatch_failures_total counter\n");
    out.push_str(&format!(
        "warmpool_dispatch_failures_total{{cause=\"exhausted\"}} {}\n",
        snapshot.exhausted
    ));
    out.push_str(&format!(
        "warmpool_dispatch_failures_total{{cause=\"rejected\"}} {}\n",
        snapshot.dispatch_rejected
    ));

    counter(
        &mut out,
        "warmpool_invocations_timed_out_total",
        "Invocations that exceeded their deadline.",
        snapshot.timed_out,
    );

    out
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} counter\n"));
    out.push_str(&format!("{name} {value}\n"));
}
