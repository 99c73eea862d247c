//! Blog backend REST client
//!
//! Every authorized call reads the bearer token from the session manager at
//! request time and checks the caller's role before anything is sent.

use std::sync::Arc;

use edublog_core::{ApiConfig, Envelope, Role, SessionManager, UserRecord};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, Result};
use crate::models::{
    Comment, CreateUserOutcome, ImageFile, LikeStatus, NewPost, NewUser, Page, Pagination, Post,
    UserUpdate,
};

const AUTHORS: &[Role] = &[Role::Professor, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

/// Path prefix of uploaded images inside public URLs
const UPLOADS_MARKER: &str = "/uploads/images/";

/// Shared reqwest client with the configured timeout
pub(crate) fn http_client(config: &ApiConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!("edublog/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ApiError::Http)
}

/// Blog backend client
#[derive(Clone)]
pub struct BlogClient {
    client: Client,
    base_url: Url,
    session: Arc<SessionManager>,
}

impl BlogClient {
    /// Create a new client bound to a session
    pub fn new(config: &ApiConfig, session: Arc<SessionManager>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            edublog_core::Error::Config(format!("Invalid API base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(edublog_core::Error::Config(format!(
                "API base URL {} cannot carry a path",
                config.base_url
            ))
            .into());
        }
        Ok(Self {
            client: http_client(config)?,
            base_url,
            session,
        })
    }

    /// Endpoint under the base URL; each segment is percent-encoded on its own
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidArgument(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Token of the current session; fails when signed out
    fn bearer(&self) -> Result<String> {
        let session = self.session.session();
        Ok(session.bearer_token()?.to_string())
    }

    /// Token plus the user, after checking the user holds one of `roles`
    fn authorize(&self, roles: &[Role]) -> Result<(String, UserRecord)> {
        let session = self.session.session();
        let user = session.require_role(roles)?.clone();
        let token = session.bearer_token()?.to_string();
        Ok((token, user))
    }

    /// Attach the token when signed in; public reads work without one
    fn maybe_authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Parse the envelope and turn failures into `ApiError::Server`
    fn parse<T: DeserializeOwned>(status: StatusCode, body: &str, what: &str) -> Result<Envelope<T>> {
        let envelope: Envelope<T> = match serde_json::from_str(body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                error!("{}: unreadable response: {}", what, e);
                return Err(ApiError::Parse(format!("{}: {}", what, e)));
            }
            Err(_) => {
                error!("{} failed: {}", what, status);
                return Err(ApiError::Server {
                    status: status.as_u16(),
                    message: format!("{} failed", what),
                });
            }
        };

        if !status.is_success() || !envelope.success {
            let message = envelope
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} failed", what));
            error!("{} failed: {} - {}", what, status, message);
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(envelope)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<Envelope<T>> {
        let (status, body) = self.execute(request).await?;
        debug!("{}: {}", what, status);
        Self::parse(status, &body, what)
    }

    fn require_data<T>(envelope: Envelope<T>, what: &str) -> Result<T> {
        envelope
            .data
            .ok_or_else(|| ApiError::Parse(format!("{}: response has no data", what)))
    }

    fn page<T>(envelope: Envelope<Vec<T>>) -> Page<T> {
        let pagination = envelope
            .pagination
            .and_then(|value| serde_json::from_value::<Pagination>(value).ok());
        Page {
            items: envelope.data.unwrap_or_default(),
            pagination,
        }
    }

    fn check_id(id: &str, what: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(ApiError::InvalidArgument(format!("{} id is empty", what)));
        }
        if id == "." || id == ".." {
            return Err(ApiError::InvalidArgument(format!("{} id is not valid: {}", what, id)));
        }
        Ok(())
    }

    async fn image_part(image: &ImageFile) -> Result<Part> {
        let bytes = tokio::fs::read(&image.path).await?;
        debug!("Attaching image {} ({} bytes)", image.file_name(), bytes.len());
        let part = Part::bytes(bytes)
            .file_name(image.file_name())
            .mime_str(image.mime())?;
        Ok(part)
    }

    // ---- Users ----

    pub async fn get_user(&self, id: &str) -> Result<UserRecord> {
        Self::check_id(id, "User")?;
        let token = self.bearer()?;
        let request = self.client.get(self.url(&["users", id])?).bearer_auth(token);
        let envelope = self.send(request, "Fetch user").await?;
        Self::require_data(envelope, "Fetch user")
    }

    /// List all users (admin only)
    pub async fn list_users(&self, page: u32, limit: u32) -> Result<Page<UserRecord>> {
        let (token, _) = self.authorize(ADMINS)?;
        let request = self
            .client
            .get(self.url(&["users"])?)
            .query(&[("page", page), ("limit", limit)])
            .bearer_auth(token);
        let envelope = self.send(request, "List users").await?;
        let page = Self::page(envelope);
        debug!("Listed {} users", page.len());
        Ok(page)
    }

    /// Admins may edit anyone; other users only their own record, and never their role
    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<UserRecord> {
        Self::check_id(id, "User")?;
        let session = self.session.session();
        let token = session.bearer_token()?.to_string();
        let editor = session
            .authenticated_user()
            .ok_or(edublog_core::Error::Unauthenticated)?;
        let editing_self = editor.id == id && !update.changes_role();
        if !editing_self {
            session.require_role(ADMINS)?;
        }

        let request = self
            .client
            .put(self.url(&["users", id])?)
            .bearer_auth(token)
            .json(update);
        let envelope = self.send(request, "Update user").await?;
        info!("Updated user {}", id);
        Self::require_data(envelope, "Update user")
    }

    /// Delete a user (admin only)
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        Self::check_id(id, "User")?;
        let (token, admin) = self.authorize(ADMINS)?;
        if admin.id == id {
            return Err(ApiError::InvalidArgument(
                "You cannot delete your own account".to_string(),
            ));
        }
        let request = self
            .client
            .delete(self.url(&["users", id])?)
            .bearer_auth(token);
        self.send::<Value>(request, "Delete user").await?;
        info!("Deleted user {}", id);
        Ok(())
    }

    /// Create a user (admin only).
    ///
    /// The optional profile image is uploaded first. An upload failure is
    /// reported as a warning and the user is created without a picture.
    pub async fn create_user(
        &self,
        mut user: NewUser,
        image: Option<&ImageFile>,
    ) -> Result<CreateUserOutcome> {
        let (token, _) = self.authorize(ADMINS)?;
        let mut warnings = Vec::new();

        if let Some(image) = image {
            match self.upload_image(image).await {
                Ok(path) => user.profile_image = Some(path),
                Err(e) => {
                    warn!("Profile image upload failed, creating user without it: {}", e);
                    warnings.push(format!(
                        "Could not upload the image; the user was created without a photo ({})",
                        e.user_message()
                    ));
                }
            }
        }

        let request = self
            .client
            .post(self.url(&["users", "register"])?)
            .bearer_auth(token)
            .json(&user);
        let envelope = self.send::<Value>(request, "Create user").await?;

        // the backend answers with either the user or `{user, token}`
        let created = envelope.data.and_then(|data| {
            let record = data.get("user").cloned().unwrap_or(data);
            serde_json::from_value::<UserRecord>(record).ok()
        });

        info!("Created {} account for {}", user.role(), user.email);
        Ok(CreateUserOutcome {
            user: created,
            warnings,
        })
    }

    // ---- Posts ----

    pub async fn list_posts(&self, page: u32, limit: u32, search: Option<&str>) -> Result<Page<Post>> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }

        let request = self.maybe_authorized(self.client.get(self.url(&["posts"])?).query(&query));
        let envelope = self.send(request, "List posts").await?;
        let page = Self::page(envelope);
        debug!("Loaded {} posts", page.len());
        Ok(page)
    }

    pub async fn get_post(&self, id: &str) -> Result<Post> {
        Self::check_id(id, "Post")?;
        let request = self.maybe_authorized(self.client.get(self.url(&["posts", id])?));
        let envelope = self.send(request, "Fetch post").await?;
        Self::require_data(envelope, "Fetch post")
    }

    pub async fn user_posts(&self, user_id: &str, page: u32, limit: u32) -> Result<Page<Post>> {
        Self::check_id(user_id, "User")?;
        let token = self.bearer()?;
        let request = self
            .client
            .get(self.url(&["posts", "user", user_id])?)
            .query(&[("page", page), ("limit", limit)])
            .bearer_auth(token);
        let envelope = self.send(request, "List user posts").await?;
        Ok(Self::page(envelope))
    }

    async fn post_form(post: &NewPost, image: &ImageFile) -> Result<Form> {
        let mut form = Form::new()
            .text("title", post.title.clone())
            .text("excerpt", post.excerpt.clone())
            .text("content", post.content.clone());
        if !post.tags.is_empty() {
            form = form.text("tags", post.tags.join(","));
        }
        Ok(form.part("image", Self::image_part(image).await?))
    }

    /// Create a post (professors and admins); multipart when an image is attached
    pub async fn create_post(&self, post: &NewPost, image: Option<&ImageFile>) -> Result<Post> {
        let (token, author) = self.authorize(AUTHORS)?;
        let request = self.client.post(self.url(&["posts"])?).bearer_auth(token);
        let request = match image {
            Some(image) => request.multipart(Self::post_form(post, image).await?),
            None => request.json(post),
        };

        let envelope = self.send(request, "Create post").await?;
        let created: Post = Self::require_data(envelope, "Create post")?;
        info!("Post {} created by {}", created.id, author.id);
        Ok(created)
    }

    pub async fn update_post(&self, id: &str, post: &NewPost, image: Option<&ImageFile>) -> Result<Post> {
        Self::check_id(id, "Post")?;
        let (token, _) = self.authorize(AUTHORS)?;
        let request = self
            .client
            .put(self.url(&["posts", id])?)
            .bearer_auth(token);
        let request = match image {
            Some(image) => request.multipart(Self::post_form(post, image).await?),
            None => request.json(post),
        };

        let envelope = self.send(request, "Update post").await?;
        info!("Post {} updated", id);
        Self::require_data(envelope, "Update post")
    }

    pub async fn delete_post(&self, id: &str) -> Result<()> {
        Self::check_id(id, "Post")?;
        let (token, _) = self.authorize(AUTHORS)?;
        let request = self
            .client
            .delete(self.url(&["posts", id])?)
            .bearer_auth(token);
        self.send::<Value>(request, "Delete post").await?;
        info!("Post {} deleted", id);
        Ok(())
    }

    /// Toggle the like on a post.
    ///
    /// Uses `PUT`; backends that only route `POST` answer 404, so that is
    /// retried once as `POST`.
    pub async fn like_post(&self, id: &str) -> Result<LikeStatus> {
        Self::check_id(id, "Post")?;
        let token = self.bearer()?;
        let url = self.url(&["posts", id, "like"])?;

        let (mut status, mut body) = self
            .execute(self.client.put(url.clone()).bearer_auth(&token))
            .await?;
        if status == StatusCode::NOT_FOUND {
            debug!("PUT like not routed, retrying with POST");
            (status, body) = self
                .execute(self.client.post(url).bearer_auth(&token))
                .await?;
        }

        let envelope = Self::parse::<Value>(status, &body, "Like post")?;
        Ok(LikeStatus::from_data(envelope.data.as_ref()))
    }

    // ---- Comments ----

    pub async fn list_comments(&self, post_id: &str) -> Result<Page<Comment>> {
        if post_id.trim().is_empty() {
            warn!("Skipping comment fetch for an empty post id");
            return Ok(Page {
                items: Vec::new(),
                pagination: None,
            });
        }
        Self::check_id(post_id, "Post")?;
        let request = self.maybe_authorized(self.client.get(self.url(&["comments", "post", post_id])?));
        let envelope = self.send(request, "List comments").await?;
        Ok(Self::page(envelope))
    }

    pub async fn create_comment(&self, post_id: &str, content: &str) -> Result<Comment> {
        Self::check_id(post_id, "Post")?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::InvalidArgument("Comment is empty".to_string()));
        }
        let token = self.bearer()?;
        let request = self
            .client
            .post(self.url(&["comments"])?)
            .bearer_auth(token)
            .json(&serde_json::json!({ "content": content, "postId": post_id }));
        let envelope = self.send(request, "Create comment").await?;
        Self::require_data(envelope, "Create comment")
    }

    pub async fn like_comment(&self, id: &str) -> Result<LikeStatus> {
        Self::check_id(id, "Comment")?;
        let token = self.bearer()?;
        let request = self
            .client
            .put(self.url(&["comments", id, "like"])?)
            .bearer_auth(token);
        let envelope = self.send::<Value>(request, "Like comment").await?;
        Ok(LikeStatus::from_data(envelope.data.as_ref()))
    }

    // ---- Upload ----

    /// Upload an image and return its relative reference (`images/<file>`)
    pub async fn upload_image(&self, image: &ImageFile) -> Result<String> {
        let token = self.bearer()?;
        let form = Form::new().part("image", Self::image_part(image).await?);
        let request = self
            .client
            .post(self.url(&["upload", "image"])?)
            .bearer_auth(token)
            .multipart(form);

        let envelope = self.send::<Value>(request, "Upload image").await?;
        let data = Self::require_data(envelope, "Upload image")?;
        let path = image_reference(&data)
            .ok_or_else(|| ApiError::Parse("Upload image: no image path in response".to_string()))?;
        info!("Uploaded image as {}", path);
        Ok(path)
    }
}

/// `images/<filename>` from `data.filename`, or from a `data.url` under `/uploads/images/`
fn image_reference(data: &Value) -> Option<String> {
    if let Some(filename) = data.get("filename").and_then(Value::as_str) {
        return Some(format!("images/{}", filename));
    }
    data.get("url")
        .and_then(Value::as_str)
        .and_then(|url| url.split_once(UPLOADS_MARKER))
        .map(|(_, file)| format!("images/{}", file))
}
