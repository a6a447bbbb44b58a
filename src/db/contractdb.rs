// db/contractdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::proposalmodel::Contract;

pub(crate) const CONTRACT_COLUMNS: &str = r#"
    id, job_id, client_id, employee_id, proposal_id,
    agreed_rate, start_date, end_date, status,
    created_at, updated_at
"#;

#[async_trait]
pub trait ContractExt {
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, Error>;

    async fn get_user_contracts(&self, user_id: Uuid) -> Result<Vec<Contract>, Error>;
}

#[async_trait]
impl ContractExt for DBClient {
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {} FROM contracts WHERE id = $1",
            CONTRACT_COLUMNS
        ))
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_contracts(&self, user_id: Uuid) -> Result<Vec<Contract>, Error> {
        sqlx::query_as::<_, Contract>(&format!(
            r#"
            SELECT {}
            FROM contracts
            WHERE client_id = $1 OR employee_id = $1
            ORDER BY created_at DESC
            "#,
            CONTRACT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
