pub mod book;
pub mod book_copy;
pub mod loan;
pub mod member;
pub mod shelf;
pub mod user;

pub use book::Book;
pub use member::MemberDto;
