use super::Errors;
use crate::entity::Entity;

/// Pulls child validation errors onto the parent.
pub struct ValidationAggregator;

impl ValidationAggregator {
    /// Many-association: every failing child's `(field, message)` lands on
    /// the parent as `{namespace}_{field}`. Only the first message per
    /// composed key is kept, however many children fail on that field.
    ///
    /// Returns whether every child was valid.
    pub fn aggregate_many<'a, E, I>(children: I, namespace: &str, parent: &mut Errors) -> bool
    where
        E: Entity + 'a,
        I: IntoIterator<Item = &'a mut E>,
    {
        let mut all_valid = true;
        for child in children {
            if child.validate() {
                continue;
            }
            all_valid = false;
            for (field, message) in child.errors().iter() {
                let key = format!("{}_{}", namespace, field);
                if !parent.contains_key(&key) {
                    parent.add(&key, message);
                }
            }
        }
        all_valid
    }

    /// One-association: the child's errors are copied under their own field
    /// names. A missing child is valid.
    pub fn aggregate_one<E: Entity>(child: Option<&mut E>, parent: &mut Errors) -> bool {
        let Some(child) = child else {
            return true;
        };
        if child.validate() {
            return true;
        }
        for (field, message) in child.errors().iter() {
            parent.add(field, message);
        }
        false
    }
}
