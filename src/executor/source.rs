//! Source blocks at the root of a pipeline

use serde_json::Value;

use super::block::{check_request, ExecutionBlock, ItemBlock};
use super::errors::{ExecutorError, ExecutorResult};

/// Emits exactly one row.
///
/// The row is empty (all nulls) unless `initialize_cursor` passes an
/// enclosing row, which is then copied.
#[derive(Debug)]
pub struct SingletonBlock {
    nr_regs: usize,
    row: Vec<Value>,
    done: bool,
    initialized: bool,
}

impl SingletonBlock {
    /// Creates a singleton producing rows of `nr_regs` registers
    pub fn new(nr_regs: usize) -> Self {
        Self {
            nr_regs,
            row: vec![Value::Null; nr_regs],
            done: false,
            initialized: false,
        }
    }

    fn ensure_initialized(&self) -> ExecutorResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ExecutorError::execution_failed("singleton block is not initialized"))
        }
    }
}

impl ExecutionBlock for SingletonBlock {
    fn initialize(&mut self) -> ExecutorResult<()> {
        self.initialized = true;
        self.done = false;
        Ok(())
    }

    fn initialize_cursor(&mut self, items: Option<&ItemBlock>, pos: usize) -> ExecutorResult<()> {
        self.row = match items.and_then(|block| block.row(pos)) {
            Some(row) => row.to_vec(),
            None => vec![Value::Null; self.nr_regs],
        };
        self.row.resize(self.nr_regs, Value::Null);
        self.done = false;
        Ok(())
    }

    fn get_some(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<Option<ItemBlock>> {
        self.ensure_initialized()?;
        check_request(at_least, at_most)?;
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let mut block = ItemBlock::new(self.nr_regs);
        block.push_row(self.row.clone())?;
        Ok(Some(block))
    }

    fn skip_some(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<usize> {
        self.ensure_initialized()?;
        check_request(at_least, at_most)?;
        if self.done {
            return Ok(0);
        }
        self.done = true;
        Ok(1)
    }

    fn shutdown(&mut self) -> ExecutorResult<()> {
        self.initialized = false;
        Ok(())
    }
}

/// Emits a fixed list of rows in chunks
#[derive(Debug)]
pub struct RowsBlock {
    rows: ItemBlock,
    position: usize,
    initialized: bool,
}

impl RowsBlock {
    /// Creates a block over `rows`, each padded or truncated to `nr_regs`
    pub fn new(nr_regs: usize, rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows: ItemBlock::from_rows(nr_regs, rows),
            position: 0,
            initialized: false,
        }
    }

    fn take(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<std::ops::Range<usize>> {
        if !self.initialized {
            return Err(ExecutorError::execution_failed("rows block is not initialized"));
        }
        check_request(at_least, at_most)?;
        let start = self.position;
        let end = self.rows.len().min(start.saturating_add(at_most));
        self.position = end;
        Ok(start..end)
    }
}

impl ExecutionBlock for RowsBlock {
    fn initialize(&mut self) -> ExecutorResult<()> {
        self.initialized = true;
        self.position = 0;
        Ok(())
    }

    fn initialize_cursor(&mut self, _items: Option<&ItemBlock>, _pos: usize) -> ExecutorResult<()> {
        self.position = 0;
        Ok(())
    }

    fn get_some(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<Option<ItemBlock>> {
        let range = self.take(at_least, at_most)?;
        if range.is_empty() {
            return Ok(None);
        }
        let mut block = ItemBlock::with_capacity(self.rows.nr_regs(), range.len())?;
        for row in &self.rows.rows()[range] {
            block.push_row(row.clone())?;
        }
        Ok(Some(block))
    }

    fn skip_some(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<usize> {
        Ok(self.take(at_least, at_most)?.len())
    }

    fn shutdown(&mut self) -> ExecutorResult<()> {
        self.initialized = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_singleton_emits_once() {
        let mut block = SingletonBlock::new(2);
        block.initialize().unwrap();

        let rows = block.get_some(1, 10).unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.row(0).unwrap(), &[Value::Null, Value::Null]);
        assert!(block.get_some(1, 10).unwrap().is_none());

        block.initialize_cursor(None, 0).unwrap();
        assert_eq!(block.skip_some(1, 1).unwrap(), 1);
        assert_eq!(block.skip_some(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_singleton_copies_enclosing_row() {
        let mut block = SingletonBlock::new(2);
        block.initialize().unwrap();
        let outer = ItemBlock::from_rows(2, vec![vec![json!(1), json!(2)], vec![json!(3), json!(4)]]);

        block.initialize_cursor(Some(&outer), 1).unwrap();
        let rows = block.get_some(1, 1).unwrap().unwrap();
        assert_eq!(rows.row(0).unwrap(), &[json!(3), json!(4)]);
    }

    #[test]
    fn test_uninitialized_fails() {
        let mut block = SingletonBlock::new(1);
        assert!(block.get_some(1, 1).is_err());

        let mut rows = RowsBlock::new(1, vec![vec![json!(1)]]);
        assert!(rows.get_some(1, 1).is_err());
    }

    #[test]
    fn test_rows_block_chunks() {
        let rows: Vec<Vec<Value>> = (0..5).map(|i| vec![json!(i)]).collect();
        let mut block = RowsBlock::new(1, rows);
        block.initialize().unwrap();

        assert_eq!(block.get_some(1, 2).unwrap().unwrap().len(), 2);
        assert_eq!(block.skip_some(1, 2).unwrap(), 2);
        let last = block.get_some(1, 10).unwrap().unwrap();
        assert_eq!(last.rows(), &[vec![json!(4)]]);
        assert!(block.get_some(1, 10).unwrap().is_none());

        block.initialize_cursor(None, 0).unwrap();
        assert_eq!(block.skip_some(1, 100).unwrap(), 5);
    }

    #[test]
    fn test_shutdown_stops_block() {
        let mut block = RowsBlock::new(1, vec![vec![json!(1)]]);
        block.initialize().unwrap();
        block.shutdown().unwrap();
        assert!(block.get_some(1, 1).is_err());
    }
}
