pub mod authmap;
pub mod health;
pub mod oauth;
pub mod submit;
