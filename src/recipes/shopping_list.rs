use std::collections::BTreeMap;

use log::info;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        jwt::SessionData,
        permissions::{authorize, Action, Resource},
    },
    constants::{SHOPPING_LIST_CONTENT_TYPE, SHOPPING_LIST_FILE_NAME},
    error::{ApiError, QueryError},
    schema::{CartLine, Id, ShoppingListEntry},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShoppingList {
    pub entries: Vec<ShoppingListEntry>,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn aggregate<I>(lines: I) -> ShoppingList
where
    I: IntoIterator<Item = CartLine>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }

    ShoppingList {
        entries: totals
            .into_iter()
            .map(|((name, measurement_unit), amount)| ShoppingListEntry {
                name,
                measurement_unit,
                amount,
            })
            .collect(),
    }
}

pub async fn fetch_cart_lines(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartLine>, ApiError> {
    let rows: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        ORDER BY c.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn build_shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, ApiError> {
    let lines = fetch_cart_lines(user_id, pool).await?;
    Ok(aggregate(lines))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Turns an aggregated list into a downloadable document.
pub trait ShoppingListFormatter {
    fn file_name(&self) -> String;
    fn content_type(&self) -> String;
    fn render(&self, list: &ShoppingList) -> Vec<u8>;
}

#[derive(Debug, Clone, Default)]
pub struct PlainTextFormatter;

impl ShoppingListFormatter for PlainTextFormatter {
    fn file_name(&self) -> String {
        SHOPPING_LIST_FILE_NAME.to_owned()
    }

    fn content_type(&self) -> String {
        SHOPPING_LIST_CONTENT_TYPE.to_owned()
    }

    fn render(&self, list: &ShoppingList) -> Vec<u8> {
        let mut out = String::from("Shopping list\n\n");
        if list.is_empty() {
            out.push_str("Your shopping cart is empty.\n");
        }
        for entry in &list.entries {
            out.push_str(&format!(
                "- {} ({}): {}\n",
                entry.name, entry.measurement_unit, entry.amount
            ));
        }
        out.into_bytes()
    }
}

pub async fn download_shopping_list<F>(
    session: &SessionData,
    formatter: &F,
    pool: &Pool<Postgres>,
) -> Result<RenderedDocument, ApiError>
where
    F: ShoppingListFormatter + ?Sized,
{
    authorize(
        Some(session),
        Action::Read,
        Resource::UserRelation {
            owner_id: session.user_id,
        },
    )?;

    let list = build_shopping_list(session.user_id, pool).await?;
    info!(
        "Rendering shopping list with {} entries for user {}",
        list.entries.len(),
        session.user_id
    );

    Ok(RenderedDocument {
        file_name: formatter.file_name(),
        content_type: formatter.content_type(),
        bytes: formatter.render(&list),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    fn entry(name: &str, unit: &str, amount: i64) -> ShoppingListEntry {
        ShoppingListEntry {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    #[test]
    fn empty_cart_is_empty_list() {
        assert_eq!(aggregate(Vec::new()), ShoppingList::default());
    }

    #[test]
    fn shared_ingredient_is_summed() {
        let list = aggregate(vec![line("flour", "g", 200), line("flour", "g", 300)]);
        assert_eq!(list.entries, vec![entry("flour", "g", 500)]);
    }

    #[test]
    fn order_is_stable_regardless_of_input_order() {
        let a = aggregate(vec![
            line("sugar", "g", 50),
            line("eggs", "pcs", 2),
            line("flour", "g", 200),
            line("eggs", "pcs", 1),
        ]);
        let b = aggregate(vec![
            line("eggs", "pcs", 1),
            line("flour", "g", 200),
            line("eggs", "pcs", 2),
            line("sugar", "g", 50),
        ]);

        assert_eq!(a, b);
        assert_eq!(
            a.entries,
            vec![
                entry("eggs", "pcs", 3),
                entry("flour", "g", 200),
                entry("sugar", "g", 50),
            ]
        );
    }

    #[test]
    fn same_name_different_units_stay_apart() {
        let list = aggregate(vec![line("salt", "g", 5), line("salt", "pinch", 1)]);
        assert_eq!(
            list.entries,
            vec![entry("salt", "g", 5), entry("salt", "pinch", 1)]
        );
    }

    #[test]
    fn large_sums_do_not_overflow() {
        let list = aggregate(vec![line("water", "ml", i32::MAX), line("water", "ml", i32::MAX)]);
        assert_eq!(list.entries[0].amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn plain_text_rendering() {
        let list = aggregate(vec![line("flour", "g", 200), line("milk", "ml", 300)]);
        let text = String::from_utf8(PlainTextFormatter.render(&list)).unwrap();

        assert_eq!(text, "Shopping list\n\n- flour (g): 200\n- milk (ml): 300\n");
        assert_eq!(PlainTextFormatter.file_name(), "shopping_list.txt");
    }

    #[test]
    fn plain_text_rendering_of_empty_list() {
        let text = String::from_utf8(PlainTextFormatter.render(&ShoppingList::default())).unwrap();
        assert!(text.ends_with("Your shopping cart is empty.\n"));
    }
}
