pub mod health;
pub mod onboarding;
