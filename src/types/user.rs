pub(crate) type Username = String;

#[derive(Clone, Debug)]
pub(crate) struct AuthorizedUser {
    pub(crate) id: i64,
    pub(crate) username: Username,
    pub(crate) password_hash: String,
}
