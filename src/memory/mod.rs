use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 单次运行内的统一内存
#[derive(Debug)]
pub struct Memory {
    data: HashMap<String, Value>,
    /// 每个完整键序列化后的字节数
    data_sizes: HashMap<String, usize>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            data_sizes: HashMap::new(),
        }
    }

    fn full_key(scope: &str, key: &str) -> String {
        format!("{}:{}", scope, key)
    }

    /// 存储数据到指定作用域和键，已存在的数据会被覆盖
    pub fn store<T>(&mut self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize,
    {
        let full_key = Self::full_key(scope, key);
        let serialized = serde_json::to_value(data)?;

        self.data_sizes
            .insert(full_key.clone(), serialized.to_string().len());

        self.data.insert(full_key, serialized);
        Ok(())
    }

    /// 只写一次：键已存在时报错，保证写入后的数据不再变化
    pub fn store_once<T>(&mut self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize,
    {
        if self.has_data(scope, key) {
            bail!("memory entry {}:{} already exists and is immutable", scope, key);
        }
        self.store(scope, key, data)
    }

    /// 从指定作用域和键获取数据
    pub fn get<T>(&self, scope: &str, key: &str) -> Option<T>
    where
        T: for<'a> Deserialize<'a>,
    {
        self.data
            .get(&Self::full_key(scope, key))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// 检查是否存在指定数据
    pub fn has_data(&self, scope: &str, key: &str) -> bool {
        self.data.contains_key(&Self::full_key(scope, key))
    }

    /// 获取各作用域的数据量（字节）
    pub fn get_usage_stats(&self) -> HashMap<String, usize> {
        let mut stats = HashMap::new();

        for (key, size) in &self.data_sizes {
            let scope = key.split(':').next().unwrap_or("unknown").to_string();
            *stats.entry(scope).or_insert(0) += size;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_get() {
        let mut memory = Memory::new();
        memory.store("tasks", "research", "findings").unwrap();

        assert!(memory.has_data("tasks", "research"));
        assert_eq!(
            memory.get::<String>("tasks", "research").as_deref(),
            Some("findings")
        );
        assert!(memory.get::<String>("tasks", "missing").is_none());
    }

    #[test]
    fn test_store_once_refuses_overwrite() {
        let mut memory = Memory::new();
        memory.store_once("tasks", "timeline", "v1").unwrap();

        assert!(memory.store_once("tasks", "timeline", "v2").is_err());
        assert_eq!(
            memory.get::<String>("tasks", "timeline").as_deref(),
            Some("v1")
        );
    }

    #[test]
    fn test_size_accounting_on_overwrite() {
        let mut memory = Memory::new();
        memory.store("a", "k", "12345").unwrap();
        memory.store("a", "k", "1").unwrap();
        memory.store("b", "k", 7).unwrap();

        // 覆盖后只计最新值："1" 序列化为三个字节
        let stats = memory.get_usage_stats();
        assert_eq!(stats.get("a"), Some(&3));
        assert_eq!(stats.get("b"), Some(&1));
    }
}
