use clipflow_db::UserRepository;

use crate::blacklist::TokenBlacklist;
use crate::tokens::TokenSigner;

pub struct AppState {
    pub users: UserRepository,
    pub tokens: TokenSigner,
    pub blacklist: TokenBlacklist,
}
