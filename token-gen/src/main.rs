use std::{fs, path::PathBuf};

use chrono::Utc;
use clap::Parser;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use uuid::Uuid;

/// Mint a shared-secret JWT accepted by the onboarding API when AUTH_DEV_MODE is off.
///
/// - Signs with the same secret/algorithm as `JWT_SECRET` / `JWT_ALGORITHM`
/// - Claims: sub, role, email (optional), aud (optional), iat, exp, jti
/// - Outputs the token, ready for `Authorization: Bearer <token>`
#[derive(Parser, Debug)]
#[command(name = "token-gen", version, about)]
struct Args {
    /// Subject id (the profile primary key)
    #[arg(long)]
    sub: String,

    /// Role claim
    #[arg(long, default_value = "user")]
    role: String,

    /// Email claim
    #[arg(long)]
    email: Option<String>,

    /// Audience claim (must match JWT_AUDIENCE when the server checks it)
    #[arg(long)]
    aud: Option<String>,

    /// Shared secret. Falls back to the JWT_SECRET env var.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Read the shared secret from a file instead
    #[arg(long, value_name = "FILE", conflicts_with = "secret")]
    secret_file: Option<PathBuf>,

    /// HS256 / HS384 / HS512
    #[arg(long, default_value = "HS256")]
    alg: String,

    /// Lifetime in seconds. 0 omits `exp`.
    #[arg(long, default_value_t = 3600)]
    ttl: i64,

    /// Print only the token (no extra lines)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let secret = match (&args.secret_file, &args.secret) {
        (Some(path), _) => fs::read_to_string(path)?.trim_end().to_string(),
        (None, Some(secret)) => secret.clone(),
        (None, None) => return Err("missing --secret (or JWT_SECRET / --secret-file)".into()),
    };

    let alg: Algorithm = args.alg.parse()?;
    if !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
        return Err(format!("unsupported algorithm {:?}: shared secrets need HS*", alg).into());
    }

    let iat = Utc::now().timestamp();
    let jti = Uuid::new_v4().to_string();

    let mut claims = serde_json::Map::new();
    claims.insert("sub".to_string(), serde_json::Value::String(args.sub.clone()));
    claims.insert("role".to_string(), serde_json::Value::String(args.role.clone()));
    claims.insert("iat".to_string(), serde_json::Value::Number(iat.into()));
    claims.insert("jti".to_string(), serde_json::Value::String(jti.clone()));

    if args.ttl > 0 {
        claims.insert(
            "exp".to_string(),
            serde_json::Value::Number((iat + args.ttl).into()),
        );
    }
    if let Some(email) = args.email.clone() {
        claims.insert("email".to_string(), serde_json::Value::String(email));
    }
    if let Some(aud) = args.aud.clone() {
        claims.insert("aud".to_string(), serde_json::Value::String(aud));
    }

    let token = jsonwebtoken::encode(
        &Header::new(alg),
        &serde_json::Value::Object(claims),
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    if args.quiet {
        println!("{}", token);
        return Ok(());
    }

    println!("token: {}", token);
    println!("sub: {}", args.sub);
    println!("jti: {}", jti);
    if args.ttl > 0 {
        println!("exp: {}", iat + args.ttl);
    } else {
        println!("exp: (none)");
    }
    println!("header: Authorization: Bearer {}", token);

    Ok(())
}
