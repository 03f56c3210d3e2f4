use std::collections::{btree_map::Entry, BTreeMap};

use serde::Serialize;
use sqlx::{Pool, Sqlite};

use crate::{
    constants::SHOPPING_LIST_HEADER,
    error::{Error, QueryError},
    schema::{CartLine, Id, MembershipKind, ShoppingListRow},
};

/// Consolidated ingredient demand of one user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    pub rows: Vec<ShoppingListRow>,
}

/// Sums amounts per ingredient id and orders the result by name, then id.
pub fn aggregate(
    lines: impl IntoIterator<Item = CartLine>,
) -> Result<Vec<ShoppingListRow>, Error> {
    let mut totals: BTreeMap<Id, ShoppingListRow> = BTreeMap::new();

    for line in lines {
        match totals.entry(line.ingredient_id) {
            Entry::Occupied(mut entry) => {
                let row = entry.get_mut();
                row.total_amount = row
                    .total_amount
                    .checked_add(line.amount)
                    .ok_or(Error::AmountOverflow(line.ingredient_id))?;
            }
            Entry::Vacant(entry) => {
                entry.insert(ShoppingListRow {
                    ingredient_id: line.ingredient_id,
                    name: line.name,
                    measurement_unit: line.measurement_unit,
                    total_amount: line.amount,
                });
            }
        }
    }

    let mut rows: Vec<ShoppingListRow> = totals.into_values().collect();
    rows.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then(a.ingredient_id.cmp(&b.ingredient_id))
    });
    Ok(rows)
}

pub async fn build_shopping_list(user_id: Id, pool: &Pool<Sqlite>) -> Result<ShoppingList, Error> {
    let lines: Vec<CartLine> = sqlx::query_as(
        "
        SELECT ri.ingredient_id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM memberships m
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = m.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE m.user_id = ? AND m.kind = ?
    ",
    )
    .bind(user_id)
    .bind(MembershipKind::CartItem)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    log::trace!("> Aggregating {} cart lines for user {user_id}", lines.len());

    Ok(ShoppingList {
        rows: aggregate(lines)?,
    })
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders `ingredient,measurement_unit,amount` rows under a header line.
    pub fn to_csv(&self) -> Result<String, Error> {
        let mut writer = csv::Writer::from_writer(vec![]);

        writer
            .write_record(SHOPPING_LIST_HEADER)
            .map_err(|e| Error::Export(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record([
                    row.name.as_str(),
                    row.measurement_unit.as_str(),
                    row.total_amount.to_string().as_str(),
                ])
                .map_err(|e| Error::Export(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Export(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
    }
}
