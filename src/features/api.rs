//! Blocking client for the Snap Sign REST API.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A document owned by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub path: String,
}

impl Document {
    pub fn display_name(&self) -> &str {
        self.original_name
            .as_deref()
            .or(self.filename.as_deref())
            .unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
}

/// Body of a 2xx login reply. A missing token still counts as a failed login.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Everything the client needs from the network.
pub trait Remote: Send {
    fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;
    fn register(&self, name: &str, email: &str, password: &str) -> Result<()>;
    fn list_documents(&self, token: &str) -> Result<Vec<Document>>;
    fn upload_document(&self, token: &str, file_name: &str, bytes: Vec<u8>) -> Result<Document>;
    /// Raw GET, used for the document being signed.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
    /// Public URL of a stored document.
    fn document_url(&self, path: &str) -> String;
}

pub struct HttpRemote {
    config: Config,
    client: Client,
}

impl HttpRemote {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response)?;
        Ok(response.json()?)
    }

    fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .ok()
            .and_then(|body| body.message);
        Err(Error::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl Remote for HttpRemote {
    fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let response = self
            .client
            .post(self.config.api_url("/api/auth/login"))
            .json(&LoginRequest { email, password })
            .send()?;
        Self::handle_response(response)
    }

    fn register(&self, name: &str, email: &str, password: &str) -> Result<()> {
        let response = self
            .client
            .post(self.config.api_url("/api/auth/register"))
            .json(&RegisterRequest {
                name,
                email,
                password,
            })
            .send()?;
        Self::check_status(response)?;
        Ok(())
    }

    fn list_documents(&self, token: &str) -> Result<Vec<Document>> {
        let response = self
            .client
            .get(self.config.api_url("/api/docs/user"))
            .header(header::AUTHORIZATION, Self::bearer(token))
            .send()?;
        Self::handle_response(response)
    }

    fn upload_document(&self, token: &str, file_name: &str, bytes: Vec<u8>) -> Result<Document> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("pdf", part);
        let response = self
            .client
            .post(self.config.api_url("/api/docs/upload"))
            .header(header::AUTHORIZATION, Self::bearer(token))
            .multipart(form)
            .send()?;
        Self::handle_response(response)
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = Self::check_status(self.client.get(url).send()?)?;
        Ok(response.bytes()?.to_vec())
    }

    fn document_url(&self, path: &str) -> String {
        self.config.api_url(path)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_name_falls_back_to_filename() {
        let doc: Document =
            serde_json::from_str(r#"{"filename":"x-123.pdf","path":"uploads/x-123.pdf","_id":"1"}"#)
                .unwrap();
        assert_eq!(doc.display_name(), "x-123.pdf");

        let doc: Document = serde_json::from_str(
            r#"{"originalName":"contract.pdf","filename":"x.pdf","path":"uploads/x.pdf"}"#,
        )
        .unwrap();
        assert_eq!(doc.display_name(), "contract.pdf");
    }

    #[test]
    fn login_reply_without_token_parses() {
        let reply: LoginResponse = serde_json::from_str(r#"{"message":"Invalid credentials"}"#).unwrap();
        assert!(reply.token.is_none());
        assert_eq!(reply.message.as_deref(), Some("Invalid credentials"));
    }

    mod http {
        use super::*;
        use crate::config::Config;
        use crate::error::Error;
        use mockito::{Matcher, Server};
        use serde_json::json;

        fn remote(server: &Server) -> HttpRemote {
            HttpRemote::new(Config {
                api_base_url: server.url(),
                request_timeout_secs: 5,
                ..Config::default()
            })
            .unwrap()
        }

        #[test]
        fn login_posts_credentials() {
            let mut server = Server::new();
            let mock = server
                .mock("POST", "/api/auth/login")
                .match_body(Matcher::Json(json!({"email": "ada@example.com", "password": "pw"})))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"token":"tok","user":{"name":"Ada","email":"ada@example.com"}}"#)
                .create();

            let reply = remote(&server).login("ada@example.com", "pw").unwrap();
            mock.assert();
            assert_eq!(reply.token.as_deref(), Some("tok"));
            assert_eq!(reply.user.unwrap().name, "Ada");
        }

        #[test]
        fn rejected_login_carries_server_message() {
            let mut server = Server::new();
            server
                .mock("POST", "/api/auth/login")
                .with_status(401)
                .with_header("content-type", "application/json")
                .with_body(r#"{"message":"Invalid credentials"}"#)
                .create();

            let err = remote(&server).login("a@b", "x").unwrap_err();
            assert!(matches!(
                err,
                Error::Status { status: 401, message: Some(ref m) } if m == "Invalid credentials"
            ));
        }

        #[test]
        fn register_accepts_created_and_reports_bare_failures() {
            let mut server = Server::new();
            let created = server
                .mock("POST", "/api/auth/register")
                .match_body(Matcher::Json(json!({"name": "Ada", "email": "a@b", "password": "pw"})))
                .with_status(201)
                .create();
            remote(&server).register("Ada", "a@b", "pw").unwrap();
            created.assert();

            let mut server = Server::new();
            server
                .mock("POST", "/api/auth/register")
                .with_status(500)
                .with_body("oops")
                .create();
            let err = remote(&server).register("Ada", "a@b", "pw").unwrap_err();
            assert!(matches!(err, Error::Status { status: 500, message: None }));
        }

        #[test]
        fn listing_sends_bearer_token() {
            let mut server = Server::new();
            let mock = server
                .mock("GET", "/api/docs/user")
                .match_header("authorization", "Bearer tok")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"[{"originalName":"contract.pdf","path":"uploads/c.pdf"}]"#)
                .create();

            let docs = remote(&server).list_documents("tok").unwrap();
            mock.assert();
            assert_eq!(docs.len(), 1);
            assert_eq!(docs[0].display_name(), "contract.pdf");
        }

        #[test]
        fn upload_sends_pdf_part() {
            let mut server = Server::new();
            let mock = server
                .mock("POST", "/api/docs/upload")
                .match_header("authorization", "Bearer tok")
                .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
                .match_body(Matcher::AllOf(vec![
                    Matcher::Regex(r#"name="pdf"; filename="contract.pdf""#.into()),
                    Matcher::Regex("application/pdf".into()),
                    Matcher::Regex("%PDF-1.4".into()),
                ]))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"originalName":"contract.pdf","path":"uploads/c.pdf"}"#)
                .create();

            let doc = remote(&server)
                .upload_document("tok", "contract.pdf", b"%PDF-1.4".to_vec())
                .unwrap();
            mock.assert();
            assert_eq!(doc.path, "uploads/c.pdf");
        }

        #[test]
        fn fetch_bytes_returns_body_and_fails_on_missing() {
            let mut server = Server::new();
            server
                .mock("GET", "/uploads/c.pdf")
                .with_status(200)
                .with_body("%PDF-1.4")
                .create();
            server.mock("GET", "/uploads/gone.pdf").with_status(404).create();

            let remote = remote(&server);
            let url = remote.document_url("uploads/c.pdf");
            assert_eq!(url, format!("{}/uploads/c.pdf", server.url()));
            assert_eq!(remote.fetch_bytes(&url).unwrap(), b"%PDF-1.4");

            let err = remote
                .fetch_bytes(&remote.document_url("/uploads/gone.pdf"))
                .unwrap_err();
            assert!(matches!(err, Error::Status { status: 404, .. }));
        }
    }

    #[test]
    fn status_error_exposes_server_message() {
        let err = Error::Status {
            status: 400,
            message: Some("User exists".into()),
        };
        assert_eq!(err.server_message(), Some("User exists"));
        assert_eq!(err.to_string(), "http_status:400:User exists");
    }
}
