use careers_core::{Application, ApplicationActivity, ApplicationSubmission, ValidationError};
use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};

use crate::{CareerService, ServiceError};

impl CareerService {
    /// Validates, persists the application with its `submitted` activity and
    /// bumps the position's application counter. Nothing is written when
    /// validation fails.
    pub async fn submit_application(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<Application, ServiceError> {
        let validated = submission.validate()?;
        let position_id = validated.position_id;

        let position = self
            .store
            .get_position(position_id)
            .await?
            .filter(|position| position.is_listed())
            .ok_or(ValidationError::PositionUnavailable { position_id })?;

        let application = validated.into_application(Utc::now());
        let created = ApplicationActivity::submitted(&application);
        self.store
            .insert_application(&application, &created)
            .instrument(info_span!("intake.insert", application_id = %application.id))
            .await?;

        let applications = position.applications_count.saturating_add(1);
        if let Err(err) = self
            .store
            .set_applications_count(position.id, applications)
            .await
        {
            warn!(position_id = %position.id, error = %err, "application counter update failed");
        }

        info!(
            application_id = %application.id,
            position = %position.slug,
            "application submitted"
        );
        Ok(application)
    }
}
