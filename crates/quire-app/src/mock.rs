//! In-memory [`BlogApi`] that records every call.

use std::collections::VecDeque;
use std::sync::Mutex;

use quire_common::{
    ApiFailure, Author, Blog, BlogApi, BlogSubmission, LoginRequest, QuireError, RegisterRequest,
    User,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Register { email: String },
    Login { email: String, password: String },
    Logout,
    CreateBlog(BlogSubmission),
    UpdateBlog(BlogSubmission),
    ListUserBlogs(String),
    ListBlogs,
    DeleteBlog(String),
    FetchBlog(String),
}

pub fn user(name: &str) -> User {
    User {
        id: format!("id-{}", name.to_lowercase()),
        name: name.to_string(),
        email: format!("{}@b.com", name.to_lowercase()),
        verified: Some(true),
    }
}

pub fn blog(id: &str, title: &str, author: &User, created: &str) -> Blog {
    Blog {
        id: Some(id.to_string()),
        title: title.to_string(),
        content: format!("<p>Body of {title}</p>"),
        tags: vec!["rust".into()],
        image: Some(format!("https://img.example/{id}.png")),
        author: Some(Author::Populated {
            id: author.id.clone(),
            name: author.name.clone(),
            email: author.email.clone(),
        }),
        created_at: created.parse().ok(),
        updated_at: None,
    }
}

pub struct MockApi {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<VecDeque<(u16, ApiFailure)>>,
    blogs: Mutex<Vec<Blog>>,
    credential: Mutex<Option<String>>,
    login_user: User,
}

impl MockApi {
    pub fn new() -> Self {
        Self::with_blogs(Vec::new())
    }

    pub fn with_blogs(blogs: Vec<Blog>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            blogs: Mutex::new(blogs),
            credential: Mutex::new(None),
            login_user: user("A"),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn blogs(&self) -> Vec<Blog> {
        self.blogs.lock().unwrap().clone()
    }

    pub fn set_credential(&self, credential: &str) {
        *self.credential.lock().unwrap() = Some(credential.to_string());
    }

    /// Make the next call fail with this reply.
    pub fn fail_next(&self, status: u16, failure: ApiFailure) {
        self.failures.lock().unwrap().push_back((status, failure));
    }

    fn record(&self, call: Call) -> Result<(), QuireError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().pop_front() {
            Some((status, failure)) => Err(QuireError::Api { status, failure }),
            None => Ok(()),
        }
    }
}

impl BlogApi for MockApi {
    async fn register(&self, request: &RegisterRequest) -> Result<Option<User>, QuireError> {
        self.record(Call::Register {
            email: request.email.clone(),
        })?;
        Ok(Some(user(&request.name)))
    }

    async fn login(&self, request: &LoginRequest) -> Result<User, QuireError> {
        self.record(Call::Login {
            email: request.email.clone(),
            password: request.password.clone(),
        })?;
        Ok(self.login_user.clone())
    }

    async fn logout(&self) -> Result<(), QuireError> {
        self.record(Call::Logout)?;
        self.credential.lock().unwrap().take();
        Ok(())
    }

    async fn create_blog(&self, submission: &BlogSubmission) -> Result<(), QuireError> {
        self.record(Call::CreateBlog(submission.clone()))?;
        let mut blogs = self.blogs.lock().unwrap();
        let id = format!("new-{}", blogs.len() + 1);
        blogs.push(Blog {
            id: Some(id.clone()),
            title: submission.title.clone(),
            content: submission.content.clone(),
            tags: submission.tags.clone(),
            image: Some(format!("https://img.example/{id}.png")),
            author: Some(Author::Id(submission.user_id.clone())),
            created_at: None,
            updated_at: None,
        });
        Ok(())
    }

    async fn update_blog(&self, submission: &BlogSubmission) -> Result<(), QuireError> {
        self.record(Call::UpdateBlog(submission.clone()))?;
        let mut blogs = self.blogs.lock().unwrap();
        let Some(blog) = blogs
            .iter_mut()
            .find(|b| b.id.is_some() && b.id == submission.blog_id)
        else {
            return Err(QuireError::Api {
                status: 404,
                failure: ApiFailure::Message("Blog not found".into()),
            });
        };
        blog.title = submission.title.clone();
        blog.content = submission.content.clone();
        blog.tags = submission.tags.clone();
        Ok(())
    }

    async fn list_user_blogs(&self, user_id: &str) -> Result<Vec<Blog>, QuireError> {
        self.record(Call::ListUserBlogs(user_id.to_string()))?;
        Ok(self
            .blogs()
            .into_iter()
            .filter(|b| b.author.as_ref().map(Author::id) == Some(user_id))
            .collect())
    }

    async fn list_blogs(&self) -> Result<Vec<Blog>, QuireError> {
        self.record(Call::ListBlogs)?;
        Ok(self.blogs())
    }

    async fn delete_blog(&self, blog_id: &str) -> Result<(), QuireError> {
        self.record(Call::DeleteBlog(blog_id.to_string()))?;
        self.blogs
            .lock()
            .unwrap()
            .retain(|b| b.id.as_deref() != Some(blog_id));
        Ok(())
    }

    async fn fetch_blog(&self, blog_id: &str) -> Result<Option<Blog>, QuireError> {
        self.record(Call::FetchBlog(blog_id.to_string()))?;
        Ok(self
            .blogs()
            .into_iter()
            .find(|b| b.id.as_deref() == Some(blog_id)))
    }

    fn credential(&self) -> Option<String> {
        self.credential.lock().unwrap().clone()
    }

    fn restore_credential(&self, credential: &str) {
        self.set_credential(credential);
    }
}
