//! 权限定义
//!
//! 静态角色权限表。角色只有两种：
//! - `admin`：全部权限（含用户管理）
//! - `operator`：发票日常操作

/// 可配置权限列表
///
/// 不包含 "all" 和 "users:manage"，这些是系统级权限
pub const ALL_PERMISSIONS: &[&str] = &[
    "invoices:create", // 开立发票
    "invoices:read",   // 查询发票
    "invoices:update", // 发票补充（备注等）
    "invoices:void",   // 作废发票
    "invoices:export", // 导出 CSV
];

/// Admin 专属权限（不在可配置列表中）
pub const ADMIN_ONLY_PERMISSIONS: &[&str] = &[
    "users:manage", // 用户管理
    "all",          // 超级权限
];

/// 管理员默认权限
pub const DEFAULT_ADMIN_PERMISSIONS: &[&str] = &["all"];

/// 操作员默认权限（全部发票操作）
pub const DEFAULT_OPERATOR_PERMISSIONS: &[&str] = &[
    "invoices:create",
    "invoices:read",
    "invoices:update",
    "invoices:void",
    "invoices:export",
];

/// 按角色名取默认权限；未知角色得到空权限
pub fn get_default_permissions(role_name: &str) -> Vec<String> {
    match role_name {
        "admin" => DEFAULT_ADMIN_PERMISSIONS
            .iter()
            .map(|s| s.to_string())
            .collect(),
        "operator" => DEFAULT_OPERATOR_PERMISSIONS
            .iter()
            .map(|s| s.to_string())
            .collect(),
        _ => vec![],
    }
}

/// 检查权限字符串是否合法
pub fn is_valid_permission(permission: &str) -> bool {
    ALL_PERMISSIONS.contains(&permission)
        || ADMIN_ONLY_PERMISSIONS.contains(&permission)
        || permission.ends_with(":*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_gets_all() {
        assert_eq!(get_default_permissions("admin"), vec!["all".to_string()]);
    }

    #[test]
    fn test_operator_gets_invoice_permissions() {
        let perms = get_default_permissions("operator");
        assert_eq!(perms.len(), 5);
        assert!(perms.contains(&"invoices:void".to_string()));
        assert!(!perms.contains(&"users:manage".to_string()));
    }

    #[test]
    fn test_unknown_role_gets_nothing() {
        assert!(get_default_permissions("auditor").is_empty());
        assert!(get_default_permissions("").is_empty());
    }

    #[test]
    fn test_permission_validation() {
        assert!(is_valid_permission("invoices:create"));
        assert!(is_valid_permission("invoices:*"));
        assert!(is_valid_permission("all"));
        assert!(!is_valid_permission("orders:void"));
    }
}
