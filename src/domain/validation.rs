//! フォーム入力の検証。ネットワーク呼び出しの前に実行する。

use super::model::book::BookDraft;
use super::model::cache::normalize_isbn;
use super::model::id::BookId;
use super::model::patron::{LoanRequest, PatronRef, Registration};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid ISBN format: '{0}'")]
    InvalidIsbn(String),

    #[error("invalid email address: '{0}'")]
    InvalidEmail(String),
}

/// ISBN-10（末尾はX可）またはISBN-13。ハイフンと空白は無視する。
pub fn is_valid_isbn(isbn: &str) -> bool {
    let digits: Vec<char> = normalize_isbn(isbn).chars().collect();
    match digits.len() {
        10 => {
            digits[..9].iter().all(|c| c.is_ascii_digit())
                && (digits[9].is_ascii_digit() || digits[9] == 'X' || digits[9] == 'x')
        }
        13 => digits.iter().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// `local@domain.tld` 形式。空白と2つ目の`@`は不可。
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // ドメイン内のいずれかの`.`の前後が空でなければよい
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// 追加・更新フォームを検証し、前後空白を除去したDraftを返す。
pub fn validate_draft(draft: &BookDraft) -> Result<BookDraft, ValidationError> {
    let title = required(&draft.title, "title")?;
    let author = required(&draft.author, "author")?;
    let isbn = required(&draft.isbn, "isbn")?;
    if !is_valid_isbn(&isbn) {
        return Err(ValidationError::InvalidIsbn(isbn));
    }
    Ok(BookDraft {
        title,
        author,
        isbn,
    })
}

pub fn validate_registration(reg: &Registration) -> Result<Registration, ValidationError> {
    let name = required(&reg.name, "name")?;
    let email = required(&reg.email, "email")?;
    if !is_valid_email(&email) {
        return Err(ValidationError::InvalidEmail(email));
    }
    Ok(Registration { name, email })
}

pub fn validate_loan(req: &LoanRequest) -> Result<LoanRequest, ValidationError> {
    let book_id = required(req.book_id.as_str(), "book")?;
    let patron = match &req.patron {
        PatronRef::Email(email) => {
            let email = required(email, "email")?;
            if !is_valid_email(&email) {
                return Err(ValidationError::InvalidEmail(email));
            }
            PatronRef::Email(email)
        }
        PatronRef::UserName(name) => PatronRef::UserName(required(name, "user name")?),
    };
    Ok(LoanRequest {
        book_id: BookId::new(book_id),
        patron,
    })
}
