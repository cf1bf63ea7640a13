//! 各实体的服务调用（对 REST 端点的薄封装）

use super::{ApiClient, ApiResult, FormPart, HttpTransport, RequestFlags};
use bobinas_shared::protocol::{
    ApiRequest, ClientesRequest, HttpMethod, LogoutRequest, METHOD_OVERRIDE_FIELD, MeRequest, Resource,
    ScanInventoryRequest,
};
use bobinas_shared::{
    Bobina, BobinaFilter, ConfigPayload, InventoryItem, InventoryPayload, LeadCredentials,
    LeadVerification, LoginRequest, LoginResponse, NewBobina, Page, RetentionConfig, User,
    UserPayload,
};

/// 照片在 multipart 中的字段名
pub const PHOTO_FIELD: &str = "foto";

impl<T: HttpTransport> ApiClient<T> {
    // --- 认证 ---

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        self.call(&LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        })
        .await
    }

    /// 服务端登出，响应体忽略
    pub async fn logout(&self) -> ApiResult<()> {
        self.execute(
            LogoutRequest::METHOD,
            LogoutRequest::PATH,
            self.url(LogoutRequest::PATH),
            super::RequestBody::Empty,
            RequestFlags::default(),
        )
        .await?;
        Ok(())
    }

    pub async fn me(&self) -> ApiResult<User> {
        self.call(&MeRequest).await
    }

    pub async fn verify_lead(&self, credentials: &LeadCredentials) -> ApiResult<LeadVerification> {
        self.call(credentials).await
    }

    // --- Bobinas ---

    pub async fn list_bobinas(&self, filter: &BobinaFilter) -> ApiResult<Page<Bobina>> {
        self.get_json(Resource::Bobinas.collection_path(), &filter.query_pairs())
            .await
    }

    pub async fn get_bobina(&self, id: u64) -> ApiResult<Bobina> {
        self.get_json(&Resource::Bobinas.item_path(id), &[]).await
    }

    /// 按 HU 精确查找（用于冲突时展示已有记录）
    pub async fn find_bobina_by_hu(&self, hu: &str) -> ApiResult<Option<Bobina>> {
        let filter = BobinaFilter {
            search: hu.to_string(),
            page: 1,
            ..Default::default()
        };
        let page = self.list_bobinas(&filter).await?;
        Ok(page.data.into_iter().find(|b| b.hu == hu))
    }

    pub async fn list_clientes(&self) -> ApiResult<Vec<String>> {
        self.call(&ClientesRequest).await
    }

    /// 登记 bobina；携带 líder 凭据时即为授权替换
    pub async fn create_bobina(
        &self,
        bobina: &NewBobina,
        foto: T::File,
        filename: &str,
        lead: Option<&LeadCredentials>,
    ) -> ApiResult<Bobina> {
        let mut parts = vec![
            FormPart::text("hu", bobina.hu.clone()),
            FormPart::text("cliente", bobina.cliente.clone()),
            FormPart::File {
                name: PHOTO_FIELD.to_string(),
                file: foto,
                filename: filename.to_string(),
            },
        ];
        if let Some(lead) = lead {
            parts.push(FormPart::text("lider_username", lead.username.trim()));
            parts.push(FormPart::text("lider_password", lead.password.clone()));
        }
        let flags = RequestFlags {
            lead_credentials: lead.is_some(),
        };
        self.send_multipart(Resource::Bobinas.collection_path(), parts, flags)
            .await
    }

    /// 更新 bobina：multipart POST + `_method=PUT`
    pub async fn update_bobina(
        &self,
        id: u64,
        cliente: &str,
        foto: Option<(T::File, String)>,
    ) -> ApiResult<Bobina> {
        let mut parts = vec![
            FormPart::text(METHOD_OVERRIDE_FIELD, "PUT"),
            FormPart::text("cliente", cliente.trim()),
        ];
        if let Some((file, filename)) = foto {
            parts.push(FormPart::File {
                name: PHOTO_FIELD.to_string(),
                file,
                filename,
            });
        }
        self.send_multipart(&Resource::Bobinas.item_path(id), parts, RequestFlags::default())
            .await
    }

    // --- Configuraciones ---

    pub async fn list_configs(&self) -> ApiResult<Vec<RetentionConfig>> {
        self.get_json(Resource::Configuraciones.collection_path(), &[])
            .await
    }

    pub async fn create_config(&self, payload: &ConfigPayload) -> ApiResult<RetentionConfig> {
        self.send_json(
            HttpMethod::Post,
            Resource::Configuraciones.collection_path(),
            payload,
        )
        .await
    }

    pub async fn update_config(&self, id: u64, payload: &ConfigPayload) -> ApiResult<RetentionConfig> {
        self.send_json(HttpMethod::Put, &Resource::Configuraciones.item_path(id), payload)
            .await
    }

    pub async fn delete_config(&self, id: u64) -> ApiResult<()> {
        self.delete(&Resource::Configuraciones.item_path(id)).await
    }

    // --- Users ---

    pub async fn list_users(&self, page: u32) -> ApiResult<Page<User>> {
        self.get_json(
            Resource::Users.collection_path(),
            &[("page", page.max(1).to_string())],
        )
        .await
    }

    pub async fn create_user(&self, payload: &UserPayload) -> ApiResult<User> {
        self.send_json(HttpMethod::Post, Resource::Users.collection_path(), payload)
            .await
    }

    pub async fn update_user(&self, id: u64, payload: &UserPayload) -> ApiResult<User> {
        self.send_json(HttpMethod::Put, &Resource::Users.item_path(id), payload)
            .await
    }

    pub async fn delete_user(&self, id: u64) -> ApiResult<()> {
        self.delete(&Resource::Users.item_path(id)).await
    }

    // --- Inventario ---

    pub async fn list_inventory(&self, search: &str, page: u32) -> ApiResult<Page<InventoryItem>> {
        let mut query = vec![("page", page.max(1).to_string())];
        if !search.trim().is_empty() {
            query.insert(0, ("search", search.trim().to_string()));
        }
        self.get_json(Resource::Inventario.collection_path(), &query)
            .await
    }

    pub async fn create_inventory_item(&self, payload: &InventoryPayload) -> ApiResult<InventoryItem> {
        self.send_json(HttpMethod::Post, Resource::Inventario.collection_path(), payload)
            .await
    }

    pub async fn update_inventory_item(
        &self,
        id: u64,
        payload: &InventoryPayload,
    ) -> ApiResult<InventoryItem> {
        self.send_json(HttpMethod::Put, &Resource::Inventario.item_path(id), payload)
            .await
    }

    pub async fn delete_inventory_item(&self, id: u64) -> ApiResult<()> {
        self.delete(&Resource::Inventario.item_path(id)).await
    }

    pub async fn scan_inventory(&self, hu: &str) -> ApiResult<InventoryItem> {
        self.call(&ScanInventoryRequest { hu: hu.to_string() }).await
    }
}
