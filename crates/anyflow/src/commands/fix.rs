use anyflow_cli_common::logger;

use crate::{
    api::BackendApi,
    context::CommandContext,
    messages::{
        msg_record_replayed, msg_record_replay_failed, msg_records_unresolved, MSG_FIX_DONE,
        MSG_NOTHING_TO_FIX,
    },
    recovery::{FailedStatusRecord, RecoveryJournal},
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub resolved: Vec<FailedStatusRecord>,
    pub unresolved: Vec<FailedStatusRecord>,
}

pub(crate) async fn run(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    ctx.settings.require_api_key()?;

    let journal = RecoveryJournal::in_dir(ctx.shell.current_dir());
    let report = repair(ctx.api.as_ref(), &journal).await?;

    if report.resolved.is_empty() && report.unresolved.is_empty() {
        logger::outro(MSG_NOTHING_TO_FIX);
        return Ok(());
    }
    if !report.unresolved.is_empty() {
        anyhow::bail!(msg_records_unresolved(
            report.unresolved.len(),
            journal.path()
        ));
    }
    logger::outro(MSG_FIX_DONE);
    Ok(())
}

/// Replays every journaled status update. Records the backend accepts, or has
/// already applied, are removed from the journal; the rest stay for a later run.
pub async fn repair(
    api: &dyn BackendApi,
    journal: &RecoveryJournal,
) -> anyhow::Result<RepairReport> {
    let mut report = RepairReport::default();

    for record in journal.records()? {
        match api
            .update_chain_deployment_status(record.chain_deployment_id, record.status)
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_transition_not_applicable() => {}
            Err(err) => {
                logger::warn(msg_record_replay_failed(record, &err));
                report.unresolved.push(record);
                continue;
            }
        }
        journal.remove(record)?;
        logger::success(msg_record_replayed(record));
        report.resolved.push(record);
    }

    Ok(report)
}
