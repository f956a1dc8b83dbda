use quire_common::User;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn set_authenticated(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn clear(&mut self) {
        self.user = None;
    }
}
