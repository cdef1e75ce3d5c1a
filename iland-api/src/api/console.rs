use crate::client::Client;
use crate::error::ApiResult;
use crate::models::console::*;
use async_trait::async_trait;

/// Account-level API methods
#[async_trait]
pub trait ConsoleApi {
    /// Known datacenter locations. Served from a static list, no request made.
    fn get_locations(&self) -> Vec<Location>;

    /// Companies the logged-in user belongs to
    async fn get_companies(&self) -> ApiResult<Vec<Company>>;

    /// Get company by ID
    async fn get_company(&self, company_id: &str) -> ApiResult<Company>;

    /// Organizations the logged-in user can see
    async fn get_orgs(&self) -> ApiResult<Vec<Org>>;
}

#[async_trait]
impl ConsoleApi for Client {
    fn get_locations(&self) -> Vec<Location> {
        LOCATION_IDS
            .iter()
            .map(|id| Location { id: id.to_string() })
            .collect()
    }

    async fn get_companies(&self) -> ApiResult<Vec<Company>> {
        let path = format!(
            "/v1/users/{}/companies",
            urlencoding::encode(&self.credentials().username)
        );
        let list: DataList<Company> = self.get_object(&path).await?;
        Ok(list.data)
    }

    async fn get_company(&self, company_id: &str) -> ApiResult<Company> {
        self.get_object(&format!("/v1/companies/{}", urlencoding::encode(company_id)))
            .await
    }

    async fn get_orgs(&self) -> ApiResult<Vec<Org>> {
        let path = format!(
            "/v1/users/{}/orgs",
            urlencoding::encode(&self.credentials().username)
        );
        let list: DataList<Org> = self.get_object(&path).await?;
        Ok(list.data)
    }
}
