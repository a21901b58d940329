use serde_json::{Value, json};
use url::Url;

use crate::error::UpstreamError;
use crate::models::admin::CustomerRow;

/// Service-role client for the directory backing the member area: the
/// `admin_users` allow-list, the `customers` table and the auth admin API.
/// Runs server-side only; the service key must never reach a browser.
pub struct SupabaseAdmin {
    http: reqwest::Client,
    base_url: Url,
    service_key: String,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl SupabaseAdmin {
    pub fn new(http: reqwest::Client, base_url: Url, service_key: String) -> Self {
        Self {
            http,
            base_url,
            service_key,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|err| UpstreamError::other(format!("supabase endpoint {path}: {err}")))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Allow-list lookup: is this email registered as an admin?
    pub async fn is_admin(&self, email: &str) -> Result<bool, UpstreamError> {
        let mut url = self.endpoint("/rest/v1/admin_users")?;
        url.query_pairs_mut()
            .append_pair("select", "email")
            .append_pair("email", &format!("eq.{email}"));

        let res = self
            .authed(self.http.get(url))
            .send()
            .await
            .map_err(|err| UpstreamError::transport("supabase admin lookup", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("supabase admin lookup", res).await);
        }
        let rows: Vec<Value> = res
            .json()
            .await
            .map_err(|err| UpstreamError::transport("supabase admin lookup", err))?;
        Ok(!rows.is_empty())
    }

    /// Create an auth identity with a confirmed email, so no confirmation
    /// mail goes out.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthUser, UpstreamError> {
        let url = self.endpoint("/auth/v1/admin/users")?;
        let payload = json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": { "name": name },
        });

        let res = self
            .authed(self.http.post(url))
            .json(&payload)
            .send()
            .await
            .map_err(|err| UpstreamError::transport("supabase create user", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("supabase create user", res).await);
        }
        let body: Value = res
            .json()
            .await
            .map_err(|err| UpstreamError::transport("supabase create user", err))?;
        parse_user(&body)
            .ok_or_else(|| UpstreamError::other("supabase create user: no id in response"))
    }

    /// Compensating deletion for a just-created identity.
    pub async fn delete_user(&self, id: &str) -> Result<(), UpstreamError> {
        let url = self.endpoint(&format!("/auth/v1/admin/users/{id}"))?;
        let res = self
            .authed(self.http.delete(url))
            .send()
            .await
            .map_err(|err| UpstreamError::transport("supabase delete user", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("supabase delete user", res).await);
        }
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<AuthUser>, UpstreamError> {
        let url = self.endpoint("/auth/v1/admin/users")?;
        let res = self
            .authed(self.http.get(url))
            .send()
            .await
            .map_err(|err| UpstreamError::transport("supabase list users", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("supabase list users", res).await);
        }
        let body: Value = res
            .json()
            .await
            .map_err(|err| UpstreamError::transport("supabase list users", err))?;
        let users = body
            .get("users")
            .and_then(Value::as_array)
            .map(|users| users.iter().filter_map(parse_user).collect())
            .unwrap_or_default();
        Ok(users)
    }

    pub async fn update_password(&self, id: &str, password: &str) -> Result<(), UpstreamError> {
        let url = self.endpoint(&format!("/auth/v1/admin/users/{id}"))?;
        let res = self
            .authed(self.http.put(url))
            .json(&json!({ "password": password }))
            .send()
            .await
            .map_err(|err| UpstreamError::transport("supabase update password", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("supabase update password", res).await);
        }
        Ok(())
    }

    /// Insert the customer row and return its representation.
    pub async fn insert_customer(&self, row: &CustomerRow) -> Result<Value, UpstreamError> {
        let url = self.endpoint("/rest/v1/customers")?;
        let res = self
            .authed(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(|err| UpstreamError::transport("supabase insert customer", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("supabase insert customer", res).await);
        }
        let mut rows: Vec<Value> = res
            .json()
            .await
            .map_err(|err| UpstreamError::transport("supabase insert customer", err))?;
        rows.pop()
            .ok_or_else(|| UpstreamError::other("supabase insert customer: empty representation"))
    }
}

fn parse_user(v: &Value) -> Option<AuthUser> {
    let id = v.get("id").and_then(Value::as_str)?.to_string();
    let email = v.get("email").and_then(Value::as_str).map(String::from);
    Some(AuthUser { id, email })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::ServerGuard) -> SupabaseAdmin {
        SupabaseAdmin::new(
            reqwest::Client::new(),
            Url::parse(&server.url()).unwrap(),
            "service-key".into(),
        )
    }

    #[tokio::test]
    async fn admin_lookup_matches_on_rows() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/admin_users")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("select".into(), "email".into()),
                mockito::Matcher::UrlEncoded("email".into(), "eq.admin@example.com".into()),
            ]))
            .match_header("apikey", "service-key")
            .with_status(200)
            .with_body(r#"[{"email":"admin@example.com"}]"#)
            .create_async()
            .await;

        assert!(client(&server).is_admin("admin@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_caller_is_not_an_admin() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/admin_users")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert!(!client(&server).is_admin("foe@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn create_user_returns_the_new_identity() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/admin/users")
            .match_body(mockito::Matcher::PartialJson(json!({
                "email": "new@example.com",
                "email_confirm": true,
                "user_metadata": { "name": "New Customer" },
            })))
            .with_status(200)
            .with_body(r#"{"id":"u-1","email":"new@example.com"}"#)
            .create_async()
            .await;

        let user = client(&server)
            .create_user("new@example.com", "hunter22", "New Customer")
            .await
            .unwrap();
        assert_eq!(user.id, "u-1");
    }

    #[tokio::test]
    async fn list_users_unwraps_the_users_array() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/admin/users")
            .with_status(200)
            .with_body(r#"{"users":[{"id":"u-1","email":"a@b.at"},{"id":"u-2"}]}"#)
            .create_async()
            .await;

        let users = client(&server).list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email.as_deref(), Some("a@b.at"));
        assert!(users[1].email.is_none());
    }

    #[tokio::test]
    async fn insert_customer_returns_the_representation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/customers")
            .match_header("Prefer", "return=representation")
            .with_status(201)
            .with_body(r#"[{"id":7,"email":"new@example.com","active":true}]"#)
            .create_async()
            .await;

        let row = CustomerRow {
            email: "new@example.com".into(),
            name: "New Customer".into(),
            program: "signature".into(),
            active: true,
            auth_user_id: "u-1".into(),
        };
        let customer = client(&server).insert_customer(&row).await.unwrap();
        assert_eq!(customer["id"], 7);
    }
}
