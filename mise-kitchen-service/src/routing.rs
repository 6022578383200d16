//! Station routing: decides which (kitchen, station) pair prepares an
//! ordered item.
//!
//! The resolver works on an in-memory snapshot of the replicated catalog
//! tables so a whole order is routed against one consistent view.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel::PgConnection;

use crate::{models, schema};

/// Station used when no routing signal exists anywhere.
pub const FALLBACK_STATION: &str = "Main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub kitchen_id: Option<String>,
    pub station_id: String,
}

#[derive(Debug, Default)]
struct ProductRoute {
    kitchen_id: Option<String>,
    station_id: Option<String>,
    category: Option<String>,
    is_template: bool,
}

#[derive(Debug, Default)]
pub struct RoutingCatalog {
    products: HashMap<String, ProductRoute>,
    categories: HashMap<String, models::CategoryRoute>,
    kitchen_defaults: HashMap<String, Option<String>>,
    station_kitchens: HashMap<String, String>,
    default_station: Option<String>,
}

impl RoutingCatalog {
    pub fn load(conn: &mut PgConnection) -> QueryResult<Self> {
        let products = schema::products::table
            .select(models::Product::as_select())
            .load(conn)?
            .into_iter()
            .map(|p| {
                (
                    p.code,
                    ProductRoute {
                        kitchen_id: p.kitchen_id,
                        station_id: p.station_id,
                        category: p.category,
                        is_template: p.is_template,
                    },
                )
            })
            .collect();

        let categories = schema::category_routes::table
            .select(models::CategoryRoute::as_select())
            .load(conn)?
            .into_iter()
            .map(|c| (c.category.clone(), c))
            .collect();

        let kitchen_defaults = schema::kitchens::table
            .select((schema::kitchens::id, schema::kitchens::default_station))
            .load::<(String, Option<String>)>(conn)?
            .into_iter()
            .collect();

        let station_kitchens = schema::stations::table
            .select((schema::stations::id, schema::stations::kitchen_id))
            .load::<(String, String)>(conn)?
            .into_iter()
            .collect();

        let default_station = schema::routing_settings::table
            .select(models::RoutingSettings::as_select())
            .first(conn)
            .optional()?
            .and_then(|s| s.default_station);

        Ok(Self {
            products,
            categories,
            kitchen_defaults,
            station_kitchens,
            default_station,
        })
    }

    pub fn is_template(&self, product_code: &str) -> bool {
        self.products
            .get(product_code)
            .map(|p| p.is_template)
            .unwrap_or(false)
    }

    /// Resolves the preparation queue for one order item. Never fails: the
    /// priority chain ends in a configured or literal default station.
    /// Each step fills only the halves of the pair still missing.
    pub fn resolve(&self, item: &models::OrderItem) -> Route {
        // 1. Explicit override on the order item.
        let mut kitchen = item.kitchen_id.clone();
        let mut station = item.station_id.clone();

        // 2. Product master defaults.
        let product = self.products.get(&item.product_code);
        if let Some(product) = product {
            kitchen = kitchen.or_else(|| product.kitchen_id.clone());
            station = station.or_else(|| product.station_id.clone());
        }

        // 3. Category route for the product's menu category.
        if station.is_none() || kitchen.is_none() {
            if let Some(route) = product
                .and_then(|p| p.category.as_deref())
                .and_then(|c| self.categories.get(c))
            {
                station = station.or_else(|| Some(route.station_id.clone()));
                kitchen = kitchen.or_else(|| route.kitchen_id.clone());
            }
        }

        // 4. The known kitchen's own default station.
        if station.is_none() {
            if let Some(kitchen) = &kitchen {
                station = self.kitchen_defaults.get(kitchen).cloned().flatten();
            }
        }

        // 5. Global default station setting, else the literal fallback.
        let station_id = station
            .or_else(|| self.default_station.clone())
            .unwrap_or_else(|| FALLBACK_STATION.to_string());

        // A station always knows its kitchen; fill the half the chain left
        // open. Unregistered fallback stations stay kitchen-less.
        let kitchen_id = kitchen.or_else(|| self.station_kitchens.get(&station_id).cloned());

        Route {
            kitchen_id,
            station_id,
        }
    }
}

/// Partitions routed items by station in first-appearance order. Each
/// group becomes exactly one ticket.
pub fn group_by_station(
    routed: Vec<(Route, models::OrderItem)>,
) -> Vec<(Route, Vec<models::OrderItem>)> {
    let mut groups: Vec<(Route, Vec<models::OrderItem>)> = Vec::new();
    for (route, item) in routed {
        match groups
            .iter_mut()
            .find(|(r, _)| r.station_id == route.station_id)
        {
            Some((_, items)) => items.push(item),
            None => groups.push((route, vec![item])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn order_item(product_code: &str) -> models::OrderItem {
        models::OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_code: product_code.to_string(),
            name: product_code.to_string(),
            quantity: 1,
            notes: None,
            options: None,
            kitchen_id: None,
            station_id: None,
            sent_at: None,
            preparing_at: None,
            ready_at: None,
            served_at: None,
        }
    }

    fn catalog() -> RoutingCatalog {
        let mut products = HashMap::new();
        products.insert(
            "steak".to_string(),
            ProductRoute {
                kitchen_id: Some("back".to_string()),
                station_id: Some("grill".to_string()),
                category: None,
                is_template: false,
            },
        );
        products.insert(
            "mojito".to_string(),
            ProductRoute {
                kitchen_id: None,
                station_id: None,
                category: Some("drinks".to_string()),
                is_template: false,
            },
        );
        products.insert(
            "soup-of-the-day".to_string(),
            ProductRoute {
                kitchen_id: Some("back".to_string()),
                station_id: None,
                category: None,
                is_template: false,
            },
        );
        products.insert(
            "combo-builder".to_string(),
            ProductRoute {
                is_template: true,
                ..Default::default()
            },
        );

        let mut categories = HashMap::new();
        categories.insert(
            "drinks".to_string(),
            models::CategoryRoute {
                category: "drinks".to_string(),
                kitchen_id: None,
                station_id: "bar".to_string(),
            },
        );

        let mut kitchen_defaults = HashMap::new();
        kitchen_defaults.insert("back".to_string(), Some("stove".to_string()));

        let mut station_kitchens = HashMap::new();
        station_kitchens.insert("grill".to_string(), "back".to_string());
        station_kitchens.insert("stove".to_string(), "back".to_string());
        station_kitchens.insert("bar".to_string(), "front".to_string());

        RoutingCatalog {
            products,
            categories,
            kitchen_defaults,
            station_kitchens,
            default_station: None,
        }
    }

    #[test]
    fn explicit_override_wins_over_product_default() {
        let mut item = order_item("steak");
        item.station_id = Some("bar".to_string());
        let route = catalog().resolve(&item);
        assert_eq!(route.station_id, "bar");
        // Kitchen still comes from the product default, the only missing half.
        assert_eq!(route.kitchen_id.as_deref(), Some("back"));
    }

    #[test]
    fn product_default_routes_the_item() {
        let route = catalog().resolve(&order_item("steak"));
        assert_eq!(route.station_id, "grill");
        assert_eq!(route.kitchen_id.as_deref(), Some("back"));
    }

    #[test]
    fn category_route_fills_the_station() {
        let route = catalog().resolve(&order_item("mojito"));
        assert_eq!(route.station_id, "bar");
        assert_eq!(route.kitchen_id.as_deref(), Some("front"));
    }

    #[test]
    fn kitchen_default_station_covers_station_less_products() {
        let route = catalog().resolve(&order_item("soup-of-the-day"));
        assert_eq!(route.station_id, "stove");
        assert_eq!(route.kitchen_id.as_deref(), Some("back"));
    }

    #[test]
    fn unknown_product_falls_back_to_the_configured_default() {
        let mut catalog = catalog();
        catalog.default_station = Some("expo".to_string());
        let route = catalog.resolve(&order_item("mystery"));
        assert_eq!(route.station_id, "expo");
        assert_eq!(route.kitchen_id, None);
    }

    #[test]
    fn no_signal_anywhere_resolves_to_the_literal_fallback() {
        let route = catalog().resolve(&order_item("mystery"));
        assert_eq!(route.station_id, FALLBACK_STATION);
        assert_eq!(route.kitchen_id, None);
    }

    #[test]
    fn template_products_are_flagged() {
        let catalog = catalog();
        assert!(catalog.is_template("combo-builder"));
        assert!(!catalog.is_template("steak"));
        assert!(!catalog.is_template("unknown"));
    }

    #[test]
    fn grouping_yields_one_group_per_station() {
        let catalog = catalog();
        // One item routed by product default, one by explicit override.
        let steak = order_item("steak");
        let mut mojito = order_item("mojito");
        mojito.station_id = Some("bar".to_string());

        let routed = vec![steak, mojito]
            .into_iter()
            .map(|i| (catalog.resolve(&i), i))
            .collect::<Vec<_>>();
        let groups = group_by_station(routed);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.station_id, "grill");
        assert_eq!(groups[0].1.len(), 1);
        assert_eq!(groups[1].0.station_id, "bar");
        assert_eq!(groups[1].1.len(), 1);
    }

    #[test]
    fn grouping_keeps_station_mates_together() {
        let catalog = catalog();
        let items = vec![
            order_item("steak"),
            order_item("mojito"),
            order_item("steak"),
        ];
        let routed = items
            .into_iter()
            .map(|i| (catalog.resolve(&i), i))
            .collect::<Vec<_>>();
        let groups = group_by_station(routed);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.station_id, "grill");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0.station_id, "bar");
        assert_eq!(groups[1].1.len(), 1);
    }
}
