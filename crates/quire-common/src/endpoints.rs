//! Request paths, relative to the configured base URL.

pub const REGISTER: &str = "/api/register";
pub const LOGIN: &str = "/api/login";
pub const LOGOUT: &str = "/api/logout";
pub const ADD_BLOG: &str = "/api/addBlog";
pub const UPDATE_BLOG: &str = "/api/blogs/update";
pub const LIST_BLOGS: &str = "/api/listBlogs";

pub fn user_blogs(user_id: &str) -> String {
    format!("/api/getUserBlogs/{user_id}")
}

pub fn delete_blog(blog_id: &str) -> String {
    format!("/api/deleteBlog/{blog_id}")
}

pub fn fetch_blog(blog_id: &str) -> String {
    format!("/api/fetchBlog/{blog_id}")
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
