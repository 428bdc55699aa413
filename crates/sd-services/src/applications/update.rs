//! Editing the fields of a filed application

use sd_contracts::applications::{ensure_editable, UpdateApplicationContract};
use sd_contracts::base::Contract;
use sd_core::result::SdResult;
use sd_core::traits::Id;
use sd_models::{Actor, Application, ApplicationUpdate};
use tracing::instrument;

use super::ApplicationWorkflow;

impl ApplicationWorkflow {
    /// Correct room, issue and the other filed fields of an open application.
    ///
    /// The status stays as it is; the history records who edited it.
    #[instrument(skip(self, update, by), fields(actor = by.id()))]
    pub async fn update(
        &self,
        id: Id,
        update: ApplicationUpdate,
        by: &Actor,
    ) -> SdResult<Application> {
        UpdateApplicationContract.validate(&update)?;

        let _guard = self.locks.lock(id).await;
        let mut application = self.find(id).await?;
        ensure_editable(application.status)?;

        application.apply(update);
        let status = application.status;
        application.record(self.entry(
            status,
            by.reference,
            format!("Details updated by {}", by.name),
        ));

        let application = self.save(&application).await?;
        tracing::info!(application_id = id, "Application updated");
        Ok(application)
    }
}
