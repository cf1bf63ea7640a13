//! 路由定义模块 - 领域模型
//!
//! 这是纯粹的业务逻辑层，不依赖于 DOM 或 web_sys。
//! 定义了应用的所有路由、每个路由允许的角色以及守卫规则。

use crate::session::LogoutReason;
use bobinas_shared::Role;
use std::fmt::Display;

/// 登录页上表示登出原因的查询参数
pub const REASON_PARAM: &str = "motivo";

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppRoute {
    /// 登录页面 (默认路由)
    #[default]
    Login,
    Dashboard,
    Bobinas,
    RegistrarBobina,
    Usuarios,
    Configuraciones,
    Inventario,
    /// 页面未找到
    NotFound,
}

const ALL_ROLES: &[Role] = &[Role::Admin, Role::Ingeniero, Role::Embarcador, Role::Lider];

impl AppRoute {
    /// 侧边栏中的顺序
    pub const NAVIGATION: [AppRoute; 6] = [
        AppRoute::Dashboard,
        AppRoute::RegistrarBobina,
        AppRoute::Bobinas,
        AppRoute::Inventario,
        AppRoute::Configuraciones,
        AppRoute::Usuarios,
    ];

    /// 将 URL path 解析为路由枚举（忽略查询串和末尾斜杠）
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        match path {
            "/" | "/login" => Self::Login,
            "/dashboard" => Self::Dashboard,
            "/bobinas" => Self::Bobinas,
            "/bobinas/nueva" => Self::RegistrarBobina,
            "/usuarios" => Self::Usuarios,
            "/configuraciones" => Self::Configuraciones,
            "/inventario" => Self::Inventario,
            _ => Self::NotFound,
        }
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
            Self::Bobinas => "/bobinas",
            Self::RegistrarBobina => "/bobinas/nueva",
            Self::Usuarios => "/usuarios",
            Self::Configuraciones => "/configuraciones",
            Self::Inventario => "/inventario",
            Self::NotFound => "/404",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Login => "Iniciar sesión",
            Self::Dashboard => "Inicio",
            Self::Bobinas => "Bobinas",
            Self::RegistrarBobina => "Registrar bobina",
            Self::Usuarios => "Usuarios",
            Self::Configuraciones => "Configuraciones",
            Self::Inventario => "Inventario",
            Self::NotFound => "No encontrado",
        }
    }

    /// **核心守卫逻辑：该路由允许的角色，空表示公开**
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::Login | Self::NotFound => &[],
            Self::Dashboard | Self::Bobinas => ALL_ROLES,
            Self::RegistrarBobina => &[Role::Admin, Role::Embarcador, Role::Lider],
            Self::Usuarios => &[Role::Admin],
            Self::Configuraciones => &[Role::Admin, Role::Ingeniero],
            Self::Inventario => &[Role::Admin, Role::Ingeniero, Role::Lider],
        }
    }

    pub fn requires_auth(&self) -> bool {
        !self.allowed_roles().is_empty()
    }

    pub fn allows(&self, role: Role) -> bool {
        !self.requires_auth() || self.allowed_roles().contains(&role)
    }

    /// 定义已认证用户是否应该离开此路由（如登录页）
    pub fn should_redirect_when_authenticated(&self) -> bool {
        matches!(self, Self::Login)
    }

    /// 每个角色登录后的首页
    pub fn home_for(role: Role) -> Self {
        match role {
            Role::Embarcador => Self::RegistrarBobina,
            _ => Self::Dashboard,
        }
    }

    /// 侧边栏中该角色可见的路由
    pub fn navigation_for(role: Role) -> Vec<AppRoute> {
        Self::NAVIGATION
            .into_iter()
            .filter(|route| route.allows(role))
            .collect()
    }

    /// 守卫：返回实际应该显示的路由
    ///
    /// - 未登录访问受保护路由 → 登录页
    /// - 已登录访问登录页或无权限的路由 → 该角色的首页
    pub fn guard(self, role: Option<Role>) -> Self {
        match role {
            None if self.requires_auth() => Self::Login,
            Some(role) if self.should_redirect_when_authenticated() || !self.allows(role) => {
                Self::home_for(role)
            }
            _ => self,
        }
    }

    /// 带登出原因的登录页地址
    pub fn login_path(reason: LogoutReason) -> String {
        match reason.query_marker() {
            Some(marker) => format!("{}?{}={}", Self::Login.to_path(), REASON_PARAM, marker),
            None => Self::Login.to_path().to_string(),
        }
    }
}

/// 从 `location.search` 中读取登出原因
pub fn logout_reason_from_query(search: &str) -> Option<LogoutReason> {
    url::form_urlencoded::parse(search.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == REASON_PARAM)
        .and_then(|(_, value)| LogoutReason::from_marker(&value))
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip_for_every_route() {
        for route in AppRoute::NAVIGATION {
            assert_eq!(AppRoute::from_path(route.to_path()), route);
        }
        assert_eq!(AppRoute::from_path("/"), AppRoute::Login);
        assert_eq!(AppRoute::from_path("/login?motivo=inactividad"), AppRoute::Login);
        assert_eq!(AppRoute::from_path("/bobinas/"), AppRoute::Bobinas);
        assert_eq!(AppRoute::from_path("/nada"), AppRoute::NotFound);
    }

    #[test]
    fn unauthenticated_users_go_to_login() {
        assert_eq!(AppRoute::Usuarios.guard(None), AppRoute::Login);
        assert_eq!(AppRoute::Login.guard(None), AppRoute::Login);
        assert_eq!(AppRoute::NotFound.guard(None), AppRoute::NotFound);
    }

    #[test]
    fn roles_are_sent_home_from_forbidden_routes() {
        assert_eq!(AppRoute::Usuarios.guard(Some(Role::Embarcador)), AppRoute::RegistrarBobina);
        assert_eq!(AppRoute::Usuarios.guard(Some(Role::Ingeniero)), AppRoute::Dashboard);
        assert_eq!(AppRoute::RegistrarBobina.guard(Some(Role::Ingeniero)), AppRoute::Dashboard);
        assert_eq!(AppRoute::Inventario.guard(Some(Role::Lider)), AppRoute::Inventario);
        assert_eq!(AppRoute::Login.guard(Some(Role::Admin)), AppRoute::Dashboard);
    }

    #[test]
    fn navigation_depends_on_role() {
        assert_eq!(AppRoute::navigation_for(Role::Admin).len(), 6);
        assert_eq!(
            AppRoute::navigation_for(Role::Embarcador),
            vec![AppRoute::Dashboard, AppRoute::RegistrarBobina, AppRoute::Bobinas]
        );
        assert!(!AppRoute::navigation_for(Role::Lider).contains(&AppRoute::Usuarios));
    }

    #[test]
    fn logout_reason_travels_in_query() {
        let path = AppRoute::login_path(LogoutReason::Inactivity);
        assert_eq!(path, "/login?motivo=inactividad");
        let search = path.split_once('?').map(|(_, q)| q).unwrap();
        assert_eq!(logout_reason_from_query(search), Some(LogoutReason::Inactivity));
        assert_eq!(AppRoute::login_path(LogoutReason::Manual), "/login");
        assert_eq!(logout_reason_from_query("?otro=1"), None);
    }
}
