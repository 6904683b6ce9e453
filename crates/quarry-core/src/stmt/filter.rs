use super::{Condition, Operand, OperatorCondition};

impl Condition {
    /// Remove operands whose values are empty.
    ///
    /// Used by the `filter_where` family so that optional user input (search
    /// forms and the like) never produces a clause. Returns `None` when
    /// nothing is left. Empty means null, a blank string or an empty list.
    pub fn filter_empty(self) -> Option<Condition> {
        match self {
            Condition::Hash(columns) => {
                let columns: indexmap::IndexMap<_, _> = columns
                    .into_iter()
                    .filter(|(_, operand)| !operand.is_empty_value())
                    .collect();
                (!columns.is_empty()).then_some(Condition::Hash(columns))
            }
            Condition::Operator(cond) => cond.filter_empty(),
            cond if cond.is_empty() => None,
            cond => Some(cond),
        }
    }
}

impl OperatorCondition {
    fn filter_empty(self) -> Option<Condition> {
        let op = self.normalized_op();

        match op.as_str() {
            "AND" | "OR" => {
                let operands: Vec<_> = self
                    .operands
                    .into_iter()
                    .filter_map(|operand| match operand {
                        Operand::Condition(cond) => cond.filter_empty().map(Operand::Condition),
                        operand if operand.is_empty_value() => None,
                        operand => Some(operand),
                    })
                    .collect();

                (!operands.is_empty()).then(|| Condition::operator(self.op, operands))
            }
            "NOT" => {
                let [Operand::Condition(cond)] = <[Operand; 1]>::try_from(self.operands).ok()?
                else {
                    return None;
                };
                cond.filter_empty().map(Condition::not)
            }
            "BETWEEN" | "NOT BETWEEN" => {
                let empty = self.operands.len() < 3
                    || self.operands[1].is_empty_value()
                    || self.operands[2].is_empty_value();
                (!empty).then_some(Condition::Operator(self))
            }
            _ => match self.operands.get(1) {
                Some(operand) if operand.is_empty_value() => None,
                _ => Some(Condition::Operator(self)),
            },
        }
    }
}

impl Operand {
    fn is_empty_value(&self) -> bool {
        match self {
            Operand::Value(value) => value.is_empty(),
            _ => false,
        }
    }
}
