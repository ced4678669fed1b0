use std::sync::Arc;

use redb::Database;

use crate::auth::JwtService;
use crate::content::ContentStore;
use crate::core::{Config, Result};
use crate::ordering::{DefaultOrderInitializer, OrderInjector, ReorderHandler};
use crate::registry::Registry;
use crate::store::{OrderStore, open_database};

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | registry | 集合排序能力 (启动时加载，不可变) |
/// | orders | 排序值 / 父节点 / 分组顺序 |
/// | content | item、分组成员、列表查询 |
/// | reorder | 排序提交处理 |
/// | jwt_service | JWT 认证服务 |
///
/// 所有字段都是浅拷贝，`Clone` 成本很低。
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub registry: Arc<Registry>,
    pub orders: OrderStore,
    pub content: ContentStore,
    pub reorder: ReorderHandler,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 创建工作目录
    /// 2. 加载集合注册表
    /// 3. 打开数据库
    /// 4. 组装各个服务
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let registry = Registry::load(config.registry_path())?;
        let db = open_database(config.database_path())?;

        tracing::info!(
            work_dir = %config.work_dir,
            collections = registry.len(),
            "Server state initialized"
        );
        Self::assemble(config.clone(), registry, db)
    }

    /// 使用已有的注册表和数据库组装状态
    pub fn assemble(config: Config, registry: Registry, db: Arc<Database>) -> Result<Self> {
        let registry = Arc::new(registry);
        let orders = OrderStore::new(db.clone())?;

        // 查询过滤器和创建钩子在这里接入内容系统
        let content = ContentStore::new(db, orders.clone(), registry.clone())?
            .with_filter(Arc::new(OrderInjector::new(
                registry.clone(),
                orders.clone(),
            )))
            .with_hook(Arc::new(DefaultOrderInitializer::new(
                registry.clone(),
                orders.clone(),
            )));

        let reorder = ReorderHandler::new(registry.clone(), orders.clone(), content.clone());
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self {
            config,
            registry,
            orders,
            content,
            reorder,
            jwt_service,
        })
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
