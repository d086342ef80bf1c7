//! Block / unblock batch handlers.

use tabled::Tabled;

use fwblock_core::{
    BatchMode, BatchReport, Direction, Engine, FailureReason, FirewallGateway, Outcome,
    OutcomeRecord,
};

use crate::cli::{BatchArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&OutcomeRecord> for OutcomeRow {
    fn from(r: &OutcomeRecord) -> Self {
        let (status, group, detail) = match &r.outcome {
            Outcome::Blocked { group, group_len } => {
                ("blocked", group.name.clone(), format!("{group_len} members"))
            }
            Outcome::Unblocked { group, group_len } => (
                "unblocked",
                group.name.clone(),
                group_len.map_or_else(|| "group removed".into(), |n| format!("{n} members")),
            ),
            Outcome::AlreadyPresent { group } => ("present", group.name.clone(), String::new()),
            Outcome::SkippedIpv6 => ("skipped", String::new(), "IPv6 not supported".into()),
            Outcome::Failed { group, reason } => (
                "failed",
                group.as_ref().map(|g| g.name.clone()).unwrap_or_default(),
                reason_text(reason),
            ),
        };
        Self {
            address: r.address.clone(),
            status,
            group,
            detail,
        }
    }
}

fn reason_text(reason: &FailureReason) -> String {
    match reason {
        FailureReason::Gateway(message) => message.clone(),
        FailureReason::NotFound => "not in any managed group".into(),
        FailureReason::Stagnation => "no progress, gave up".into(),
    }
}

fn render(format: &OutputFormat, report: &BatchReport) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<OutcomeRow> = report.results.iter().map(OutcomeRow::from).collect();
            Ok(format!(
                "{}\n{} (success {}, failed {}, existed {})",
                output::render_table(&rows),
                report.message,
                report.success_count,
                report.failed_count,
                report.existed_count,
            ))
        }
        OutputFormat::Plain => Ok(report
            .results
            .iter()
            .map(|r| format!("{}\t{}", r.address, OutcomeRow::from(r).status))
            .collect::<Vec<_>>()
            .join("\n")),
        other => output::render_single(other, report, |_| String::new(), |_| String::new()),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle<G: FirewallGateway>(
    engine: &Engine<G>,
    mode: BatchMode,
    args: BatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let raw = args.addresses.join(",");
    let direction = Direction::from(args.direction);
    let report = match mode {
        BatchMode::Block => engine.block(direction, &raw).await,
        BatchMode::Unblock => engine.unblock(direction, &raw).await,
    };

    output::print_output(&render(&global.output, &report)?, global.quiet);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::BatchFailed {
            message: report.message,
        })
    }
}
