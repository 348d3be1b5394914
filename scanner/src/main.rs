use crate::scanner::scanner::Scanner;

pub mod scanner;
pub mod utils;
pub mod web;

#[actix_web::main]
async fn main() {
    Scanner::run().await;
    Scanner::terminate().await;
}
