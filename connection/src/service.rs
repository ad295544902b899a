//! 连接与凭据管理服务模块

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use common::errors::{AppError, AppResult};
use common::models::{
    ConnectionItem, ConnectionUpdate, Credential, CredentialItem, CredentialStorage, NewConnection,
    NewCredential, StoredCredential,
};
use common::SettingsStore;

use crate::session_manager::SessionManager;

/// 新增连接的结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAdded {
    pub ok: bool,
    pub alias: String,
    pub database: Option<String>,
    pub credential: Option<String>,
    pub is_default: bool,
    pub hint: &'static str,
}

/// 连接测试结果
#[derive(Debug, Serialize)]
pub struct ConnectionTested {
    pub ok: bool,
    pub alias: String,
    pub database: Option<String>,
    pub ping: serde_json::Value,
}

/// 新增凭据的结果
#[derive(Debug, Serialize)]
pub struct CredentialAdded {
    pub ok: bool,
    pub credential: String,
    pub username: String,
    pub storage: CredentialStorage,
    pub hint: String,
}

/// 删除凭据的结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRemoved {
    pub ok: bool,
    pub removed: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cleared_from: Vec<String>,
}

/// 连接管理服务
pub struct ConnectionService {
    store: Arc<SettingsStore>,
}

impl ConnectionService {
    /// 创建新的连接服务实例
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self { store }
    }

    /// 新增连接；引用的凭据必须可解析
    pub fn add(&self, req: NewConnection, make_default: bool) -> AppResult<ConnectionAdded> {
        req.check()?;
        if let Some(credential) = &req.credential {
            self.require_credential(credential)?;
        }

        let (alias, connection) = req.into_connection();
        let database = connection.database_name();
        let credential = connection.credential.clone();
        self.store.store_connection(&alias, connection)?;
        if make_default {
            self.store.set_default_connection(&alias)?;
        }

        info!(alias = %alias, "连接已保存");
        Ok(ConnectionAdded {
            ok: true,
            is_default: self.store.default_connection_alias().as_deref() == Some(alias.as_str()),
            alias,
            database,
            credential,
            hint: "Test with: agent-mongo connection test",
        })
    }

    /// 部分更新连接，返回被修改的字段名
    pub fn update(&self, alias: &str, update: ConnectionUpdate) -> AppResult<Vec<&'static str>> {
        if let Some(Some(credential)) = &update.credential {
            self.require_credential(credential)?;
        }
        let fields = update.updated_fields();
        self.store.update_connection(alias, update)?;
        info!(alias = %alias, ?fields, "连接已更新");
        Ok(fields)
    }

    /// 删除连接
    pub fn remove(&self, alias: &str) -> AppResult<()> {
        self.store.remove_connection(alias)?;
        info!(alias = %alias, "连接已删除");
        Ok(())
    }

    /// 设置默认连接
    pub fn set_default(&self, alias: &str) -> AppResult<()> {
        self.store.set_default_connection(alias)
    }

    /// 列出所有连接
    pub fn list(&self) -> Vec<ConnectionItem> {
        let doc = self.store.read();
        let default_alias = doc.default_connection.as_deref();
        doc.connections
            .iter()
            .map(|(alias, connection)| ConnectionItem::new(alias, connection, default_alias))
            .collect()
    }

    /// 解析连接并执行 ping
    pub async fn test(&self, sessions: &SessionManager, explicit: Option<&str>) -> AppResult<ConnectionTested> {
        let resolved = sessions.resolve(explicit).await?;
        let reply = resolved
            .session
            .ping("admin", self.store.runtime_config().query_timeout())
            .await?;
        Ok(ConnectionTested {
            ok: true,
            database: resolved.database,
            alias: resolved.alias,
            ping: common::utils::Serializer::default().serialize_document(reply),
        })
    }

    fn require_credential(&self, alias: &str) -> AppResult<()> {
        match self.store.get_credential(alias) {
            Some(_) => Ok(()),
            None => Err(AppError::CredentialNotFound {
                alias: alias.to_string(),
                available: self.store.read().credential_aliases(),
            }),
        }
    }
}

/// 凭据管理服务
pub struct CredentialService {
    store: Arc<SettingsStore>,
}

impl CredentialService {
    /// 创建新的凭据服务实例
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self { store }
    }

    /// 新增或替换凭据，优先写入系统密钥库
    pub fn add(&self, req: NewCredential) -> AppResult<CredentialAdded> {
        req.check()?;
        let storage = self.store.store_credential(
            &req.alias,
            Credential {
                username: req.username.clone(),
                password: req.password,
            },
        )?;
        info!(alias = %req.alias, ?storage, "凭据已保存");
        Ok(CredentialAdded {
            ok: true,
            hint: format!(
                "Use with: agent-mongo connection add <alias> <uri> --credential {}",
                req.alias
            ),
            credential: req.alias,
            username: req.username,
            storage,
        })
    }

    /// 删除凭据；`force` 时先清除连接上的引用
    pub fn remove(&self, alias: &str, force: bool) -> AppResult<CredentialRemoved> {
        let cleared_from = self.store.remove_credential(alias, force)?;
        info!(alias = %alias, cleared = cleared_from.len(), "凭据已删除");
        Ok(CredentialRemoved {
            ok: true,
            removed: alias.to_string(),
            cleared_from,
        })
    }

    /// 列出所有凭据（密码始终脱敏）
    pub fn list(&self) -> Vec<CredentialItem> {
        let doc = self.store.read();
        doc.credentials
            .iter()
            .map(|(alias, stored)| {
                let username = match stored {
                    StoredCredential::Inline { username, .. } => Some(username.clone()),
                    StoredCredential::External { .. } => self
                        .store
                        .resolve_credential(alias, stored.clone())
                        .map(|credential| credential.username),
                };
                CredentialItem {
                    name: alias.clone(),
                    username,
                    password: "***",
                    storage: stored.storage(),
                    used_by: doc.connections_using(alias),
                }
            })
            .collect()
    }
}
