use crate::{
    InventoryItem, LeadCredentials, LeadVerification, LoginRequest, LoginResponse, User,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A trait that defines the request-response relationship and metadata for a fixed-path endpoint.
pub trait ApiRequest: Serialize {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The URL path, relative to the API base.
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;
}

// =========================================================
// Fixed-path requests
// =========================================================

impl ApiRequest for LoginRequest {
    type Response = LoginResponse;
    const PATH: &'static str = "/login";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Serialize)]
pub struct LogoutRequest;

impl ApiRequest for LogoutRequest {
    type Response = serde::de::IgnoredAny;
    const PATH: &'static str = "/logout";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Serialize)]
pub struct MeRequest;

impl ApiRequest for MeRequest {
    type Response = User;
    const PATH: &'static str = "/me";
    const METHOD: HttpMethod = HttpMethod::Get;
}

/// Distinct client names for pickers
#[derive(Debug, Serialize)]
pub struct ClientesRequest;

impl ApiRequest for ClientesRequest {
    type Response = Vec<String>;
    const PATH: &'static str = "/bobinas/clientes";
    const METHOD: HttpMethod = HttpMethod::Get;
}

/// Verify a lead's credentials before an authorized replacement
impl ApiRequest for LeadCredentials {
    type Response = LeadVerification;
    const PATH: &'static str = "/auth/verificar-lider";
    const METHOD: HttpMethod = HttpMethod::Post;
}

/// Look up (or register) a catalog item by its scanned serial
#[derive(Debug, Serialize)]
pub struct ScanInventoryRequest {
    pub hu: String,
}

impl ApiRequest for ScanInventoryRequest {
    type Response = InventoryItem;
    const PATH: &'static str = "/inventario/scan";
    const METHOD: HttpMethod = HttpMethod::Post;
}

// =========================================================
// CRUD resources
// =========================================================

/// REST collections with `/:id` item routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Bobinas,
    Configuraciones,
    Users,
    Inventario,
}

impl Resource {
    pub fn collection_path(&self) -> &'static str {
        match self {
            Resource::Bobinas => "/bobinas",
            Resource::Configuraciones => "/configuraciones",
            Resource::Users => "/users",
            Resource::Inventario => "/inventario",
        }
    }

    pub fn item_path(&self, id: u64) -> String {
        format!("{}/{}", self.collection_path(), id)
    }
}

/// Form field used by the backend to tunnel PUT through multipart POST
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_paths() {
        assert_eq!(Resource::Bobinas.collection_path(), "/bobinas");
        assert_eq!(Resource::Users.item_path(12), "/users/12");
        assert_eq!(Resource::Inventario.item_path(3), "/inventario/3");
    }

    #[test]
    fn fixed_endpoints() {
        assert_eq!(<LoginRequest as ApiRequest>::PATH, "/login");
        assert_eq!(<LeadCredentials as ApiRequest>::METHOD, HttpMethod::Post);
        assert_eq!(<ClientesRequest as ApiRequest>::METHOD.as_str(), "GET");
    }
}
