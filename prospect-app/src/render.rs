//! Plain-text output for the terminal. `--json` bypasses all of this.

use std::fmt::Write;

use prospect_common::{DiscoveryResult, NameInference};
use prospect_core::{DiscoveryOutcome, DiscoveryReport, NoResultsExplanation, NoResultsReason};
use prospect_store::Tally;

const DEMO_BANNER: &str = "DEMO DATA: these rows are synthetic and are not real contacts.";

pub fn report(report: &DiscoveryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "profile `{}` via {} ({} ms{})",
        report.profile,
        report.search_engine,
        report.elapsed_ms,
        if report.cancelled { ", interrupted" } else { "" }
    );

    match &report.outcome {
        DiscoveryOutcome::Found => {}
        DiscoveryOutcome::NoResults(why) => {
            explanation(&mut out, why);
            return out;
        }
        DiscoveryOutcome::Synthetic(why) => {
            explanation(&mut out, why);
            let _ = writeln!(out, "{DEMO_BANNER}");
        }
    }

    results(&mut out, &report.results);
    out
}

fn explanation(out: &mut String, why: &NoResultsExplanation) {
    let reason = match why.reason {
        NoResultsReason::NoUrls => "no search results",
        NoResultsReason::NoEmails => "no addresses on the visited pages",
        NoResultsReason::Cancelled => "cancelled before anything was found",
    };
    let _ = writeln!(out, "nothing found: {reason}");
    let _ = writeln!(out, "  sites:     {}", why.sites.join(", "));
    let _ = writeln!(out, "  providers: {}", why.providers.join(", "));
    let _ = writeln!(out, "  queries run: {}", why.queries_run.len());
    for q in &why.queries_run {
        let _ = writeln!(out, "    {q}");
    }
    let _ = writeln!(out, "  urls visited: {}", why.urls_visited.len());
}

pub fn results(out: &mut String, rows: &[DiscoveryResult]) {
    for r in rows {
        let _ = writeln!(
            out,
            "{:<24} {:<36} {:<14} {:.2} {}{}",
            r.name,
            r.email,
            r.platform,
            r.confidence,
            r.method,
            if r.synthetic { " [demo]" } else { "" }
        );
        let _ = writeln!(out, "  {}", r.source_url);
    }
}

pub fn inferences(emails: &[String], names: &[NameInference]) -> String {
    let mut out = String::new();
    for (email, n) in emails.iter().zip(names) {
        let _ = writeln!(out, "{email:<36} {:<24} {:.2} {}", n.name, n.confidence, n.method);
        if let Some(reasoning) = &n.reasoning {
            let _ = writeln!(out, "  {reasoning}");
        }
    }
    out
}

pub fn tallies(total: i64, by_profile: &[Tally], by_engine: &[Tally]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{total} stored results");
    for (title, rows) in [("by profile", by_profile), ("by search engine", by_engine)] {
        let _ = writeln!(out, "{title}:");
        for t in rows {
            let _ = writeln!(out, "  {:<28} {}", t.key, t.count);
        }
    }
    out
}
