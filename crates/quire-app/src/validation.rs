//! Form schemas for registration, login and blog authoring.
//!
//! Each check reports at most one message per field: the first rule the
//! field breaks. Validation is synchronous and never touches the network.

use std::fmt;
use std::sync::LazyLock;

use quire_common::{LoginRequest, RegisterRequest};
use quire_editor_core::{Document, Inline};
use regex::Regex;

pub const MAX_TAGS: usize = 5;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)*$").unwrap());

static PASSWORD_CHARSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@$!%*?&]{8,}$").unwrap());

const PASSWORD_SPECIALS: &str = "@$!%*?&";

pub const PASSWORD_PATTERN_MESSAGE: &str = "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Outcome of validating one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub field_errors: Vec<FieldError>,
}

impl Validation {
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty()
    }

    /// Message for `field`, if it failed.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.field_errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.field_errors.first()
    }

    fn check(&mut self, field: &'static str, outcome: Result<(), &str>) {
        if let Err(message) = outcome {
            self.field_errors.push(FieldError {
                field,
                message: message.to_string(),
            });
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.field_errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

fn email(value: &str) -> Result<(), &'static str> {
    let value = value.trim();
    if value.is_empty() {
        Err("Email is required")
    } else if !EMAIL_RE.is_match(value) {
        Err("Invalid email address")
    } else {
        Ok(())
    }
}

/// Lowercase, uppercase, digit and special character, nothing outside the
/// allowed set, at least 8 long.
fn password_pattern(value: &str) -> bool {
    PASSWORD_CHARSET_RE.is_match(value)
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

fn password(value: &str, min_len: usize, min_message: &'static str) -> Result<(), &'static str> {
    let value = value.trim();
    if value.is_empty() {
        Err("Password is required")
    } else if value.chars().count() < min_len {
        Err(min_message)
    } else if !password_pattern(value) {
        Err(PASSWORD_PATTERN_MESSAGE)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Validation {
        let mut v = Validation::default();
        v.check(
            "name",
            if self.name.trim().is_empty() {
                Err("Name is required")
            } else {
                Ok(())
            },
        );
        v.check("email", email(&self.email));
        v.check(
            "password",
            password(&self.password, 8, "Password must be at least 8 characters"),
        );
        v.check(
            "confirmPassword",
            if self.confirm_password.is_empty() {
                Err("Confirm password is required")
            } else if self.confirm_password != self.password.trim() {
                Err("Passwords must match")
            } else {
                Ok(())
            },
        );
        v
    }

    /// Request body with the trimmed values the schema checked.
    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// The 6-character floor is checked first, but the complexity pattern
    /// still demands 8.
    pub fn validate(&self) -> Validation {
        let mut v = Validation::default();
        v.check("email", email(&self.email));
        v.check(
            "password",
            password(&self.password, 6, "Password must be at least 6 characters"),
        );
        v
    }

    pub fn to_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }
}

/// Whether the body has no text and no images.
pub fn body_is_blank(doc: &Document) -> bool {
    doc.leaves().all(|leaf| {
        leaf.inlines.iter().all(|inline| match inline {
            Inline::Text { text, .. } => text.trim().is_empty(),
            Inline::Image { .. } => false,
        })
    })
}

/// The authoring form as the blog schema sees it.
#[derive(Debug, Clone, Copy)]
pub struct BlogForm<'a> {
    pub title: &'a str,
    pub body: &'a Document,
    pub has_cover: bool,
    pub tags: &'a [String],
}

impl BlogForm<'_> {
    pub fn validate(&self) -> Validation {
        let mut v = Validation::default();
        v.check(
            "title",
            if self.title.trim().is_empty() {
                Err("Title is required")
            } else if self.title.trim() != self.title {
                Err("Title cannot have leading or trailing spaces")
            } else {
                Ok(())
            },
        );
        v.check(
            "content",
            if body_is_blank(self.body) {
                Err("Blog content is required")
            } else {
                Ok(())
            },
        );
        v.check(
            "image",
            if self.has_cover {
                Ok(())
            } else {
                Err("Cover image is required")
            },
        );
        v.check("tags", tags(self.tags));
        v
    }
}

fn tags(tags: &[String]) -> Result<(), &'static str> {
    if tags.is_empty() {
        return Err("At least one tag is required");
    }
    if tags.len() > MAX_TAGS {
        return Err("Maximum 5 tags allowed");
    }
    for tag in tags {
        if tag.trim().is_empty() {
            return Err("Tags cannot be empty");
        }
        if tag.trim() != tag {
            return Err("Tags cannot have leading or trailing spaces");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_editor_core::parse;

    fn register(password: &str) -> RegisterForm {
        RegisterForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: password.into(),
            confirm_password: password.into(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let v = register("Secret1!").validate();
        assert!(v.valid(), "{v}");
    }

    #[test]
    fn test_registration_password_rules() {
        for weak in ["secret1!", "SECRET1!", "Secretxx!", "Secret12", "Secret1!#"] {
            let v = register(weak).validate();
            assert_eq!(v.error("password"), Some(PASSWORD_PATTERN_MESSAGE), "{weak}");
        }
        let v = register("Se1!").validate();
        assert_eq!(v.error("password"), Some("Password must be at least 8 characters"));
        let v = register("   ").validate();
        assert_eq!(v.error("password"), Some("Password is required"));
    }

    #[test]
    fn test_registration_fields() {
        let form = RegisterForm {
            name: "  ".into(),
            email: "not-an-email".into(),
            password: "Secret1!".into(),
            confirm_password: "Secret1?".into(),
        };
        let v = form.validate();
        assert_eq!(v.error("name"), Some("Name is required"));
        assert_eq!(v.error("email"), Some("Invalid email address"));
        assert_eq!(v.error("password"), None);
        assert_eq!(v.error("confirmPassword"), Some("Passwords must match"));
        assert_eq!(v.first().map(|e| e.field), Some("name"));

        let mut form = register("Secret1!");
        form.confirm_password.clear();
        form.email = " ".into();
        let v = form.validate();
        assert_eq!(v.error("email"), Some("Email is required"));
        assert_eq!(v.error("confirmPassword"), Some("Confirm password is required"));
    }

    #[test]
    fn test_email_shapes() {
        for ok in ["a@b.com", "first.last@mail.example.org", "dev@localhost"] {
            assert_eq!(email(ok), Ok(()), "{ok}");
        }
        for bad in ["a@", "@b.com", "a b@c.com", "a@b.", "a@.com", "a@@b.com"] {
            assert_eq!(email(bad), Err("Invalid email address"), "{bad}");
        }
    }

    #[test]
    fn test_registration_trims_password() {
        let form = RegisterForm {
            password: " Secret1! ".into(),
            confirm_password: "Secret1!".into(),
            ..register("")
        };
        assert!(form.validate().valid());
        assert_eq!(form.to_request().password, "Secret1!");
    }

    #[test]
    fn test_login_rules() {
        assert!(LoginForm::new("a@b.com", "Secret1!").validate().valid());
        let v = LoginForm::new("a@b.com", "Ab1!").validate();
        assert_eq!(v.error("password"), Some("Password must be at least 6 characters"));
        let v = LoginForm::new("a@b.com", "Ab1!xy").validate();
        assert_eq!(v.error("password"), Some(PASSWORD_PATTERN_MESSAGE));
        let v = LoginForm::new("", "").validate();
        assert_eq!(v.error("email"), Some("Email is required"));
        assert_eq!(v.error("password"), Some("Password is required"));
    }

    #[test]
    fn test_blog_schema() {
        let body = parse("<p>Hello</p>");
        let tags = vec!["rust".to_string()];
        let form = BlogForm {
            title: "Title",
            body: &body,
            has_cover: true,
            tags: &tags,
        };
        assert!(form.validate().valid());

        let blank = parse("<p>   </p><p></p>");
        let v = BlogForm {
            title: " Title",
            body: &blank,
            has_cover: false,
            tags: &[],
        }
        .validate();
        assert_eq!(v.error("title"), Some("Title cannot have leading or trailing spaces"));
        assert_eq!(v.error("content"), Some("Blog content is required"));
        assert_eq!(v.error("image"), Some("Cover image is required"));
        assert_eq!(v.error("tags"), Some("At least one tag is required"));

        let many: Vec<String> = (0..6).map(|i| format!("t{i}")).collect();
        let v = BlogForm { tags: &many, ..form }.validate();
        assert_eq!(v.error("tags"), Some("Maximum 5 tags allowed"));

        let padded = vec![" x".to_string()];
        let v = BlogForm { tags: &padded, title: "  ", ..form }.validate();
        assert_eq!(v.error("tags"), Some("Tags cannot have leading or trailing spaces"));
        assert_eq!(v.error("title"), Some("Title is required"));
    }

    #[test]
    fn test_image_only_body_is_content() {
        let body = parse(r#"<p><img src="https://x/y.png" alt=""></p>"#);
        assert!(!body_is_blank(&body));
        assert!(body_is_blank(&Document::new()));
    }
}
