use careers_core::{
    available_actions, Application, ApplicationActivity, ApplicationStatus, QuickAction,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{CareerService, ServiceError};

/// Staff view of one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationDetail {
    pub application: Application,
    pub history: Vec<ApplicationActivity>,
    pub actions: Vec<QuickAction>,
}

impl CareerService {
    pub async fn list_applications(
        &self,
        position_id: Option<Uuid>,
    ) -> Result<Vec<Application>, ServiceError> {
        Ok(self.store.list_applications(position_id).await?)
    }

    pub async fn get_application(&self, id: Uuid) -> Result<Application, ServiceError> {
        self.store
            .get_application(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "application",
                key: id.to_string(),
            })
    }

    pub async fn application_detail(&self, id: Uuid) -> Result<ApplicationDetail, ServiceError> {
        let application = self.get_application(id).await?;
        let history = self.store.list_activities(id).await?;
        let actions = available_actions(application.status);
        Ok(ApplicationDetail {
            application,
            history,
            actions,
        })
    }

    /// Moves the application to `target` if the lifecycle graph allows it.
    /// A refused move writes nothing.
    pub async fn transition_application(
        &self,
        id: Uuid,
        target: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<Application, ServiceError> {
        let mut application = self.get_application(id).await?;
        let change = application
            .plan_transition(target, notes, Utc::now())
            .inspect_err(|rejected| {
                warn!(
                    application_id = %id,
                    from = %rejected.from,
                    to = %rejected.to,
                    "transition rejected"
                );
            })?;

        self.store.apply_status_change(&change).await?;
        info!(
            application_id = %id,
            from = %change.from,
            to = %change.to,
            "application status changed"
        );

        application.status = change.to;
        application.last_activity_at = change.at;
        Ok(application)
    }

    /// Only rejected applications may be deleted. Their history is kept.
    pub async fn delete_application(&self, id: Uuid) -> Result<(), ServiceError> {
        let application = self.get_application(id).await?;
        if !application.status.can_delete() {
            warn!(application_id = %id, status = %application.status, "delete refused");
            return Err(ServiceError::DeleteRejected {
                status: application.status,
            });
        }
        self.store.delete_application(id).await?;
        info!(application_id = %id, "application deleted");
        Ok(())
    }
}
