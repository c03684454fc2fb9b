//! JSON shapes returned by the user endpoints.

use serde::Serialize;

use crate::store::UserRow;

/// Format for `created_at` in responses.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const SEARCH_USER_PATH: &str = "/search_user";
pub const SEARCH_USER_BY_ID_PATH: &str = "/search_user_by_id";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Link {
    pub href: String,
}

impl Link {
    fn new(href: String) -> Self {
        Self { href }
    }

    pub fn all_users() -> Self {
        Self::new(SEARCH_USER_PATH.to_string())
    }

    pub fn user_by_id(user_id: i64) -> Self {
        Self::new(format!("{}?user_id={}", SEARCH_USER_BY_ID_PATH, user_id))
    }

    /// Username search link; `None` is the unfiltered listing.
    pub fn username_search(username: Option<&str>) -> Self {
        match username {
            Some(name) => Self::new(format!(
                "{}?username={}",
                SEARCH_USER_PATH,
                urlencoding::encode(name)
            )),
            None => Self::all_users(),
        }
    }
}

/// Hyperlinks attached to each user.
#[derive(Debug, Clone, Serialize)]
pub struct UserLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    pub search_by_username: Link,
    pub all_users: Link,
}

/// One user as rendered in a response.
#[derive(Debug, Clone, Serialize)]
pub struct UserResource {
    pub user_id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
    #[serde(rename = "_links")]
    pub links: UserLinks,
}

impl From<UserRow> for UserResource {
    fn from(row: UserRow) -> Self {
        let links = UserLinks {
            self_link: Link::user_by_id(row.user_id),
            search_by_username: Link::username_search(Some(&row.username)),
            all_users: Link::all_users(),
        };

        Self {
            user_id: row.user_id,
            created_at: row.created_at.format(CREATED_AT_FORMAT).to_string(),
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: row.phone_number,
            address: row.address,
            links,
        }
    }
}

/// Links on the response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    pub all_users: Link,
}

/// Body of a successful lookup.
#[derive(Debug, Clone, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserResource>,
    #[serde(rename = "_links")]
    pub links: CollectionLinks,
}

impl UsersResponse {
    pub fn new(rows: Vec<UserRow>, self_link: Link) -> Self {
        Self {
            users: rows.into_iter().map(UserResource::from).collect(),
            links: CollectionLinks {
                self_link,
                all_users: Link::all_users(),
            },
        }
    }
}
