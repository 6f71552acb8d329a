use archive_cms::config::AppConfig;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Failed logins before an IP is blocked
const MAX_FAILED_LOGINS: u32 = 5;
const BLOCK_MINUTES: i64 = 30;
const RESET_CODE_MINUTES: i64 = 10;

/// Login failure records / 登录失败记录
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub fail_count: u32,
    pub last_attempt: DateTime<Utc>,
}

/// Reset code records / 重置码记录
#[derive(Debug, Clone)]
pub struct ResetCodeRecord {
    pub user_id: i64,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// Login security state / 登录安全状态
pub struct LoginSecurity {
    /// IP login failure records: IP -> LoginAttempt / IP登录失败记录
    pub ip_attempts: RwLock<HashMap<String, LoginAttempt>>,
    /// Reset code storage: username -> ResetCodeRecord / 重置码存储
    pub reset_codes: RwLock<HashMap<String, ResetCodeRecord>>,
}

impl LoginSecurity {
    pub fn new() -> Self {
        Self {
            ip_attempts: RwLock::new(HashMap::new()),
            reset_codes: RwLock::new(HashMap::new()),
        }
    }

    /// Check if IP is blocked (5 or more failures within 30 minutes) / 检查IP是否被封禁
    pub fn is_ip_blocked(&self, ip: &str) -> bool {
        let attempts = self.ip_attempts.read();
        if let Some(attempt) = attempts.get(ip) {
            if attempt.fail_count >= MAX_FAILED_LOGINS {
                let elapsed = Utc::now().signed_duration_since(attempt.last_attempt);
                return elapsed.num_minutes() < BLOCK_MINUTES;
            }
        }
        false
    }

    /// Record login failure / 记录登录失败
    pub fn record_failure(&self, ip: &str) {
        let now = Utc::now();
        let mut attempts = self.ip_attempts.write();
        attempts.retain(|_, a| now.signed_duration_since(a.last_attempt).num_minutes() < BLOCK_MINUTES);
        let entry = attempts.entry(ip.to_string()).or_insert(LoginAttempt {
            fail_count: 0,
            last_attempt: now,
        });
        entry.fail_count += 1;
        entry.last_attempt = now;
    }

    /// Login successful, clear failure records / 登录成功
    pub fn clear_failure(&self, ip: &str) {
        self.ip_attempts.write().remove(ip);
    }

    /// Store reset code, replacing any earlier one for the same user / 存储重置码
    pub fn store_reset_code(&self, username: String, user_id: i64, code: String) {
        let mut reset_codes = self.reset_codes.write();
        let now = Utc::now();
        reset_codes.retain(|_, v| now.signed_duration_since(v.created_at).num_minutes() < RESET_CODE_MINUTES);
        reset_codes.insert(username, ResetCodeRecord { user_id, code, created_at: now });
    }

    /// Verify and consume reset code, return user_id / 验证并消费重置码
    pub fn verify_reset_code(&self, username: &str, code: &str) -> Option<i64> {
        let mut reset_codes = self.reset_codes.write();
        if let Some(record) = reset_codes.remove(username) {
            let elapsed = Utc::now().signed_duration_since(record.created_at);
            if elapsed.num_minutes() < RESET_CODE_MINUTES && record.code == code {
                return Some(record.user_id);
            }
        }
        None
    }
}

impl Default for LoginSecurity {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AppState {
    pub db: SqlitePool,
    pub config: AppConfig,
    pub login_security: LoginSecurity,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        Self {
            db,
            config,
            login_security: LoginSecurity::new(),
        }
    }
}
