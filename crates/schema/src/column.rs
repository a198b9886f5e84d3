use serde::{Deserialize, Serialize};

use cellspace_common::Value;

use crate::{ComponentType, SchemaError, check_value};

/// A growable, schema-typed column of component values.
///
/// One column stores one component for every row of an archetype. The store
/// treats it as an opaque array: rows are addressed by index, writes are
/// validated against the declared type, and removal keeps the column densely
/// packed via swap-with-last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    name: String,
    ty: ComponentType,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: &str, ty: ComponentType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ComponentType {
        &self.ty
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Overwrite an existing row.
    pub fn set(&mut self, row: usize, value: Value) -> Result<(), SchemaError> {
        check_value(&self.name, &self.ty, &value)?;
        let len = self.values.len();
        match self.values.get_mut(row) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(SchemaError::RowOutOfBounds {
                component: self.name.clone(),
                row,
                len,
            }),
        }
    }

    /// Append a value, returning the new row index.
    pub fn push(&mut self, value: Value) -> Result<usize, SchemaError> {
        check_value(&self.name, &self.ty, &value)?;
        self.values.push(value);
        Ok(self.values.len() - 1)
    }

    /// Remove a row by moving the last row into its slot.
    pub fn swap_remove(&mut self, row: usize) -> Value {
        self.values.swap_remove(row)
    }

    /// Raw access to the packed values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_column() -> Column {
        Column::new("hp", ComponentType::Int)
    }

    #[test]
    fn push_and_get() {
        let mut col = int_column();
        assert_eq!(col.push(Value::Int(10)).unwrap(), 0);
        assert_eq!(col.push(Value::Int(20)).unwrap(), 1);
        assert_eq!(col.get(0), Some(&Value::Int(10)));
        assert_eq!(col.get(2), None);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn push_rejects_wrong_type() {
        let mut col = int_column();
        let err = col.push(Value::Text("oops".into())).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
        assert!(col.is_empty());
    }

    #[test]
    fn set_validates_type_and_bounds() {
        let mut col = int_column();
        col.push(Value::Int(1)).unwrap();
        col.set(0, Value::Int(2)).unwrap();
        assert_eq!(col.get(0), Some(&Value::Int(2)));

        assert!(matches!(
            col.set(0, Value::Bool(false)),
            Err(SchemaError::TypeMismatch { .. })
        ));
        assert!(matches!(
            col.set(5, Value::Int(0)),
            Err(SchemaError::RowOutOfBounds { row: 5, .. })
        ));
    }

    #[test]
    fn swap_remove_moves_last_into_slot() {
        let mut col = int_column();
        for i in 0..4 {
            col.push(Value::Int(i)).unwrap();
        }
        let removed = col.swap_remove(1);
        assert_eq!(removed, Value::Int(1));
        assert_eq!(col.values(), &[Value::Int(0), Value::Int(3), Value::Int(2)]);
    }
}
