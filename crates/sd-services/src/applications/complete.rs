//! Completion with its stock write-off

use sd_contracts::applications::{ensure_in_progress, CompletionContract};
use sd_contracts::base::Contract;
use sd_core::result::SdResult;
use sd_core::traits::Id;
use sd_models::{
    Actor, Application, ApplicationStatus, CompletionInput, CompletionReport, UsedTool,
};
use tracing::instrument;

use super::ApplicationWorkflow;

impl ApplicationWorkflow {
    /// Close an application that is in progress with a completion report.
    ///
    /// The tools in the report are written off as one batch before the
    /// application is saved. A shortfall on any tool fails the whole
    /// completion with nothing written off; a failed save reverts the batch.
    #[instrument(skip(self, input, images, by), fields(actor = by.id(), lines = input.used_tools.len()))]
    pub async fn complete(
        &self,
        id: Id,
        input: CompletionInput,
        images: Vec<String>,
        by: &Actor,
    ) -> SdResult<Application> {
        let _guard = self.locks.lock(id).await;
        let mut application = self.find(id).await?;
        ensure_in_progress(application.status, "Completion")?;
        CompletionContract.validate(&input)?;

        let used_tools = UsedTool::merge(&input.used_tools);
        let consumption = self
            .tools
            .consume(
                &used_tools,
                by.reference,
                Some(format!("Used for application {}", application.index)),
                None,
            )
            .await?;

        let comment = format!("Completed. Work done: {}", input.work_done);
        application.completion_report = Some(CompletionReport {
            work_done: input.work_done,
            used_tools,
            other_tools: input.other_tools,
            images,
            completed_at: self.clock.now(),
            completed_by: by.id(),
            completed_by_model: by.kind(),
        });
        application.record(self.entry(
            ApplicationStatus::Completed,
            by.reference,
            comment,
        ));

        let application = match self.save(&application).await {
            Ok(saved) => saved,
            Err(e) => {
                let note = format!("Application {} was not completed", application.index);
                if let Err(revert) = self.tools.revert(&consumption, by.reference, note).await {
                    tracing::error!(application_id = id, error = %revert, "Failed to revert stock write-off");
                }
                return Err(e);
            }
        };

        tracing::info!(
            application_id = id,
            index = %application.index,
            tools = consumption.tools.len(),
            "Application completed"
        );
        self.notifier
            .application_completed(&application, by)
            .await;
        Ok(application)
    }
}
