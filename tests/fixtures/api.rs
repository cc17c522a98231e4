// @generated by routegen from the endpoint files under the routes directory.
// Do not edit by hand: this file is rewritten whenever an endpoint changes.

#[allow(unused_imports)]
use routegen::{Endpoint, Method, NoData};
pub mod get {
    use super::*;
    #[derive(Debug, Clone, PartialEq, routegen::serde::Serialize, routegen::serde::Deserialize)]
    #[serde(crate = "routegen::serde")]
    pub struct UsersIdRouteParams {
        pub id: String,
    }
    /// `GET /users/[id]`
    pub struct UsersId;
    impl Endpoint for UsersId {
        const METHOD: Method = Method::Get;
        const PATTERN: &'static str = "/users/[id]";
        type Body = NoData;
        type RouteParams = UsersIdRouteParams;
        type SearchParams = NoData;
    }
}
pub mod post {
    use super::*;
    #[derive(Debug, Clone, PartialEq, routegen::serde::Serialize, routegen::serde::Deserialize)]
    #[serde(crate = "routegen::serde")]
    pub struct UsersIdBodyTagsItem {
        pub label: String,
    }
    #[derive(Debug, Clone, PartialEq, routegen::serde::Serialize, routegen::serde::Deserialize)]
    #[serde(crate = "routegen::serde")]
    pub struct UsersIdBody {
        pub r#type: String,
        #[serde(rename = "createdAt")]
        pub created_at: String,
        pub note: (),
        pub tags: Vec<UsersIdBodyTagsItem>,
        pub nickname: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub maybe: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub count: Option<f64>,
    }
    #[derive(Debug, Clone, PartialEq, routegen::serde::Serialize, routegen::serde::Deserialize)]
    #[serde(crate = "routegen::serde")]
    pub struct UsersIdRouteParams {
        pub id: String,
    }
    #[derive(Debug, Clone, PartialEq, routegen::serde::Serialize, routegen::serde::Deserialize)]
    #[serde(crate = "routegen::serde")]
    pub struct UsersIdSearchParams {
        pub archived: bool,
    }
    /// `POST /users/[id]`
    pub struct UsersId;
    impl Endpoint for UsersId {
        const METHOD: Method = Method::Post;
        const PATTERN: &'static str = "/users/[id]";
        type Body = UsersIdBody;
        type RouteParams = UsersIdRouteParams;
        type SearchParams = UsersIdSearchParams;
    }
}
/// Every `(method, pattern)` pair served by the application.
pub const ROUTES: &[(Method, &str)] = &[
    (Method::Get, "/users/[id]"),
    (Method::Post, "/users/[id]"),
];
