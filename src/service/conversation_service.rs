// service/conversation_service.rs
use std::sync::Arc;

use crate::{
    db::{contractdb::ContractExt, jobdb::JobExt, messagedb::MessageExt, proposaldb::ProposalExt, Gateway},
    feed::{prepare_content, ConversationFeed},
    models::{
        messagemodel::{ConversationKey, Message, NewMessage},
        usermodel::User,
    },
    realtime::RealtimeHub,
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct ConversationService {
    db_client: Arc<dyn Gateway>,
    hub: Arc<RealtimeHub>,
}

impl ConversationService {
    pub fn new(db_client: Arc<dyn Gateway>, hub: Arc<RealtimeHub>) -> Self {
        Self { db_client, hub }
    }

    /// Contract threads are open to both parties; proposal threads to the
    /// proposal's author and the owner of its job.
    pub async fn authorize(&self, caller: &User, key: ConversationKey) -> Result<(), ServiceError> {
        let allowed = match key {
            ConversationKey::Contract(contract_id) => self
                .db_client
                .get_contract(contract_id)
                .await?
                .ok_or(ServiceError::ContractNotFound(contract_id))?
                .is_party(caller.id),
            ConversationKey::Proposal(proposal_id) => {
                let proposal = self
                    .db_client
                    .get_proposal(proposal_id)
                    .await?
                    .ok_or(ServiceError::ProposalNotFound(proposal_id))?;
                if proposal.employee_id == caller.id {
                    true
                } else {
                    self.db_client
                        .get_job_by_id(proposal.job_id)
                        .await?
                        .map_or(false, |job| job.is_owned_by(caller.id))
                }
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(ServiceError::forbidden())
        }
    }

    pub async fn history(&self, caller: &User, key: ConversationKey) -> Result<Vec<Message>, ServiceError> {
        self.authorize(caller, key).await?;
        Ok(self.db_client.get_conversation_messages(key).await?)
    }

    pub async fn send(&self, caller: &User, key: ConversationKey, content: &str) -> Result<Message, ServiceError> {
        self.authorize(caller, key).await?;
        let content = prepare_content(content)?;

        Ok(self
            .db_client
            .insert_message(NewMessage {
                sender_id: caller.id,
                content,
                conversation: key,
            })
            .await?)
    }

    /// A feed already bound to `key` on behalf of `caller`.
    pub async fn open_feed(&self, caller: &User, key: ConversationKey) -> Result<ConversationFeed, ServiceError> {
        self.authorize(caller, key).await?;
        let mut feed = ConversationFeed::new(self.db_client.clone(), self.hub.clone(), caller.id);
        feed.bind(key).await?;
        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use crate::{
        db::memory::MemoryGateway,
        models::usermodel::UserRole,
        service::proposal_service::{
            tests::{open_job, user},
            Decision, DecisionOutcome, ProposalService, ProposalSubmission,
        },
    };

    #[tokio::test]
    async fn parties_only() {
        let hub = Arc::new(RealtimeHub::new());
        let db = Arc::new(MemoryGateway::with_hub(hub.clone()));
        let alice = user(&db, "Alice", UserRole::Employee).await;
        let bob = user(&db, "Bob", UserRole::Client).await;
        let eve = user(&db, "Eve", UserRole::Employee).await;
        let job = open_job(&db, &bob).await;

        let proposals = ProposalService::new(db.clone());
        let proposal = proposals
            .submit(
                &alice,
                ProposalSubmission {
                    job_id: job.id,
                    cover_letter: "Pick me".to_string(),
                    proposed_rate: None,
                    estimated_duration: None,
                    attachments: Vec::new(),
                },
            )
            .await
            .unwrap();

        let service = ConversationService::new(db.clone(), hub);
        let pre_contract = ConversationKey::Proposal(proposal.id);

        service.send(&alice, pre_contract, "Any questions?").await.unwrap();
        service.send(&bob, pre_contract, "When can you start?").await.unwrap();
        assert!(matches!(
            service.send(&eve, pre_contract, "Hi").await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert_eq!(service.history(&bob, pre_contract).await.unwrap().len(), 2);

        let contract_id = match proposals.decide(&bob, proposal.id, Decision::Accept).await.unwrap() {
            DecisionOutcome::Accepted(acceptance) => acceptance.contract.id,
            other => panic!("unexpected outcome {:?}", other),
        };
        let contract = ConversationKey::Contract(contract_id);

        let feed = service.open_feed(&alice, contract).await.unwrap();
        assert_eq!(feed.conversation(), Some(contract));
        assert!(service.open_feed(&eve, contract).await.is_err());

        assert!(matches!(
            service.history(&alice, ConversationKey::Contract(Uuid::new_v4())).await.unwrap_err(),
            ServiceError::ContractNotFound(_)
        ));
    }
}
