//! Filing a new application

use chrono::Datelike;
use sd_contracts::applications::CreateApplicationContract;
use sd_contracts::base::Contract;
use sd_core::result::SdResult;
use sd_models::{Actor, Application, NewApplication};
use tracing::instrument;

use super::ApplicationWorkflow;

impl ApplicationWorkflow {
    /// File an application in `new` status under the next index of the year.
    ///
    /// `images` are URLs already returned by file storage.
    #[instrument(skip(self, input, images, filed_by), fields(user_id = filed_by.id()))]
    pub async fn create(
        &self,
        input: NewApplication,
        images: Vec<String>,
        filed_by: &Actor,
    ) -> SdResult<Application> {
        CreateApplicationContract::new().validate(&input)?;

        let now = self.clock.now();
        let draft = Application::draft(input, filed_by.reference, images).filed_at(now);
        let application = self.store.insert_with_next_index(now.year(), draft).await?;

        tracing::info!(
            application_id = application.id,
            index = %application.index,
            "Application created"
        );
        self.notifier.application_created(&application).await;
        Ok(application)
    }
}
