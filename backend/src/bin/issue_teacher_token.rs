use notes_portal_backend::{config::Config, utils::jwt::create_teacher_token};

fn main() -> anyhow::Result<()> {
    let email = std::env::args()
        .nth(1)
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .ok_or_else(|| anyhow::anyhow!("usage: issue_teacher_token <teacher-email>"))?;

    let config = Config::load()?;
    let token = create_teacher_token(email, &config.jwt_secret, config.jwt_expiration_hours)?;
    println!("{}", token);

    Ok(())
}
