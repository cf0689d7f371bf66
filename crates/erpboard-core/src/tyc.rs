//! Size × color (TyC) stock and sales matrix

use erpboard_client::{Query, Resource};
use erpboard_config::TycConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::error::{CoreError, CoreResult};
use crate::models::{Article, Color, Id, SaleLine, Size, StockRow};
use crate::services::RecordService;

/// Hard limit on size columns
pub const MAX_SIZES: usize = 20;

/// Which part of the catalogue to analyze
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TycRequest {
    #[serde(default)]
    pub article: Option<Id>,
    #[serde(default)]
    pub color: Option<Id>,
    #[serde(default)]
    pub family: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeHeader {
    pub id: Id,
    pub name: String,
}

/// One article/color pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TycRow {
    pub article_id: Id,
    pub article_name: String,
    pub color_id: Id,
    pub color_name: String,
    /// Stock per size column
    pub stock: Vec<f64>,
    /// Units sold per size column
    pub sales: Vec<f64>,
    pub total_stock: f64,
    pub total_sales: f64,
    pub rotation: f64,
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TycMatrix {
    pub sizes: Vec<SizeHeader>,
    pub rows: Vec<TycRow>,
    pub total_stock: f64,
    pub total_sales: f64,
    pub rotation: f64,
}

/// Sales over stock, 0 without stock
pub fn rotation(sales: f64, stock: f64) -> f64 {
    if stock == 0.0 {
        0.0
    } else {
        sales / stock
    }
}

/// Stock over sales, 0 without sales
pub fn coverage(stock: f64, sales: f64) -> f64 {
    if sales == 0.0 {
        0.0
    } else {
        stock / sales
    }
}

/// Source data for one matrix
#[derive(Debug, Clone, Copy)]
pub struct TycInputs<'a> {
    pub articles: &'a [Article],
    pub colors: &'a [Color],
    pub sizes: &'a [Size],
    pub stock: &'a [StockRow],
    pub sales: &'a [SaleLine],
}

/// Build one row per article/color pair over the first `max_sizes`
/// active sizes in display order.
///
/// Only pairs whose article is in `articles` (and whose color is in
/// `colors`, when colors are given) are kept. Row totals cover the
/// displayed size columns. Rows are sorted by article id, then color id.
pub fn build_matrix(inputs: &TycInputs<'_>, max_sizes: usize) -> TycMatrix {
    let mut sizes: Vec<&Size> = inputs.sizes.iter().filter(|s| s.active).collect();
    sizes.sort_by_key(|s| (s.order, s.id));
    sizes.truncate(max_sizes.min(MAX_SIZES));

    let columns: HashMap<Id, usize> = sizes.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
    let articles: HashMap<Id, &Article> = inputs.articles.iter().map(|a| (a.id, a)).collect();
    let colors: HashMap<Id, &Color> = inputs.colors.iter().map(|c| (c.id, c)).collect();
    let keep = |article: Id, color: Id| {
        articles.contains_key(&article) && (colors.is_empty() || colors.contains_key(&color))
    };

    let width = sizes.len();
    let mut cells: BTreeMap<(Id, Id), (Vec<f64>, Vec<f64>)> = BTreeMap::new();

    for row in inputs.stock.iter().filter(|r| keep(r.article, r.color)) {
        let (stock, _) = cells
            .entry((row.article, row.color))
            .or_insert_with(|| (vec![0.0; width], vec![0.0; width]));
        for (size, qty) in &row.quantities {
            if let Some(&col) = columns.get(size) {
                stock[col] += qty;
            }
        }
    }

    for line in inputs.sales.iter().filter(|l| keep(l.article, l.color)) {
        let (_, sales) = cells
            .entry((line.article, line.color))
            .or_insert_with(|| (vec![0.0; width], vec![0.0; width]));
        if let Some(&col) = columns.get(&line.size) {
            sales[col] += line.quantity;
        }
    }

    let rows: Vec<TycRow> = cells
        .into_iter()
        .map(|((article_id, color_id), (stock, sales))| {
            let total_stock: f64 = stock.iter().sum();
            let total_sales: f64 = sales.iter().sum();
            TycRow {
                article_id,
                article_name: articles
                    .get(&article_id)
                    .map(|a| a.name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| article_id.to_string()),
                color_id,
                color_name: colors
                    .get(&color_id)
                    .map(|c| c.name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| color_id.to_string()),
                stock,
                sales,
                total_stock,
                total_sales,
                rotation: rotation(total_sales, total_stock),
                coverage: coverage(total_stock, total_sales),
            }
        })
        .collect();

    let total_stock = rows.iter().map(|r| r.total_stock).sum();
    let total_sales = rows.iter().map(|r| r.total_sales).sum();

    TycMatrix {
        sizes: sizes
            .iter()
            .map(|s| SizeHeader {
                id: s.id,
                name: if s.name.is_empty() { s.id.to_string() } else { s.name.clone() },
            })
            .collect(),
        rows,
        total_stock,
        total_sales,
        rotation: rotation(total_sales, total_stock),
    }
}

// ==================== Service ====================

/// Fetches TyC inputs on demand and caches built matrices per request
pub struct TycAnalysisService {
    records: RecordService,
    cache: TtlCache<TycRequest, Arc<TycMatrix>>,
    max_sizes: usize,
}

impl TycAnalysisService {
    pub fn new(records: RecordService, max_sizes: usize, ttl: Duration) -> Self {
        Self {
            records,
            cache: TtlCache::new(ttl),
            max_sizes: max_sizes.clamp(1, MAX_SIZES),
        }
    }

    pub fn from_config(records: RecordService, config: &TycConfig) -> Self {
        Self::new(records, config.max_sizes, Duration::from_secs(config.cache_ttl_secs))
    }

    /// Matrix for `request`, from cache while fresh
    pub async fn analyze(&self, request: &TycRequest) -> CoreResult<Arc<TycMatrix>> {
        if let Some(matrix) = self.cache.get(request) {
            log::debug!(target: "erpboard::tyc", "Cache hit for {:?}", request);
            return Ok(matrix);
        }

        let mut articles_query = Query::new();
        let mut rows_query = Query::new();
        if let Some(article) = request.article {
            articles_query = articles_query.filter("id", article);
            rows_query = rows_query.filter("art", article);
        }
        if let Some(color) = request.color {
            rows_query = rows_query.filter("col", color);
        }
        let all = Query::new();

        let (articles, colors, sizes, stock, sales) = tokio::try_join!(
            self.fetch::<Article>(Resource::Articles, &articles_query),
            self.fetch::<Color>(Resource::Colors, &all),
            self.fetch::<Size>(Resource::Sizes, &all),
            self.fetch::<StockRow>(Resource::Stock, &rows_query),
            self.fetch::<SaleLine>(Resource::InvoiceLines, &rows_query),
        )?;

        let articles: Vec<Article> = articles
            .into_iter()
            .filter(|a| a.active)
            .filter(|a| match &request.family {
                Some(family) => a.family.as_deref() == Some(family.as_str()),
                None => true,
            })
            .collect();
        let wanted_colors: HashSet<Id> = request.color.into_iter().collect();
        let colors: Vec<Color> = colors
            .into_iter()
            .filter(|c| wanted_colors.is_empty() || wanted_colors.contains(&c.id))
            .collect();

        let matrix = Arc::new(build_matrix(
            &TycInputs {
                articles: &articles,
                colors: &colors,
                sizes: &sizes,
                stock: &stock,
                sales: &sales,
            },
            self.max_sizes,
        ));
        log::info!(
            target: "erpboard::tyc",
            "Built TyC matrix: {} row(s) x {} size(s)",
            matrix.rows.len(),
            matrix.sizes.len()
        );

        self.cache.insert(request.clone(), Arc::clone(&matrix));
        Ok(matrix)
    }

    /// Drop every cached matrix
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    async fn fetch<T: crate::normalize::FromRecord>(
        &self,
        resource: Resource,
        query: &Query,
    ) -> CoreResult<Vec<T>> {
        self.records
            .fetch::<T>(resource, query)
            .await
            .map(|batch| batch.records)
            .map_err(|e| CoreError::fetch(resource, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizationRules;
    use erpboard_client::{ErpClient, MemoryTransport};
    use proptest::prelude::*;
    use serde_json::json;

    fn article(id: Id) -> Article {
        Article {
            id,
            name: format!("Ring {}", id),
            family: Some("rings".to_string()),
            active: true,
        }
    }

    fn color(id: Id) -> Color {
        Color {
            id,
            name: format!("Color {}", id),
            order: id,
        }
    }

    fn size(id: Id, order: i64) -> Size {
        Size {
            id,
            name: format!("T{}", id),
            order,
            active: true,
        }
    }

    fn stock(article: Id, color: Id, quantities: &[(Id, f64)]) -> StockRow {
        StockRow {
            article,
            color,
            quantities: quantities.iter().copied().collect(),
        }
    }

    fn sold(article: Id, color: Id, size: Id, quantity: f64) -> SaleLine {
        SaleLine {
            article,
            color,
            size,
            quantity,
        }
    }

    #[test]
    fn test_matrix_rows_and_ratios() {
        let articles = vec![article(2), article(1)];
        let colors = vec![color(1), color(2)];
        let sizes = vec![size(30, 2), size(10, 1), size(20, 3)];
        let stock_rows = vec![stock(2, 1, &[(10, 4.0), (30, 2.0)]), stock(1, 2, &[(20, 5.0)])];
        let sales = vec![sold(2, 1, 10, 3.0), sold(1, 2, 20, 1.0), sold(1, 1, 10, 2.0)];

        let matrix = build_matrix(
            &TycInputs {
                articles: &articles,
                colors: &colors,
                sizes: &sizes,
                stock: &stock_rows,
                sales: &sales,
            },
            20,
        );

        let headers: Vec<Id> = matrix.sizes.iter().map(|s| s.id).collect();
        assert_eq!(headers, vec![10, 30, 20]);

        let keys: Vec<(Id, Id)> = matrix.rows.iter().map(|r| (r.article_id, r.color_id)).collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);

        let sold_only = &matrix.rows[0];
        assert_eq!(sold_only.total_stock, 0.0);
        assert_eq!(sold_only.rotation, 0.0);
        assert_eq!(sold_only.coverage, 0.0);

        let row = &matrix.rows[2];
        assert_eq!(row.stock, vec![4.0, 2.0, 0.0]);
        assert_eq!(row.sales, vec![3.0, 0.0, 0.0]);
        assert_eq!(row.rotation, 0.5);
        assert_eq!(row.coverage, 2.0);
        assert_eq!(matrix.total_stock, 11.0);
    }

    #[test]
    fn test_sizes_are_capped_and_inactive_skipped() {
        let mut sizes: Vec<Size> = (1..=30).map(|i| size(i, i)).collect();
        sizes[0].active = false;
        let articles = vec![article(1)];
        let matrix = build_matrix(
            &TycInputs {
                articles: &articles,
                colors: &[],
                sizes: &sizes,
                stock: &[stock(1, 9, &[(1, 1.0), (2, 1.0)])],
                sales: &[],
            },
            50,
        );
        assert_eq!(matrix.sizes.len(), MAX_SIZES);
        assert_eq!(matrix.sizes[0].id, 2);
        assert_eq!(matrix.rows[0].total_stock, 1.0);
        assert_eq!(matrix.rows[0].color_name, "9");
    }

    #[test]
    fn test_unknown_articles_are_ignored() {
        let articles = vec![article(1)];
        let sizes = vec![size(1, 1)];
        let matrix = build_matrix(
            &TycInputs {
                articles: &articles,
                colors: &[],
                sizes: &sizes,
                stock: &[stock(7, 1, &[(1, 3.0)])],
                sales: &[],
            },
            20,
        );
        assert!(matrix.rows.is_empty());
    }

    fn service(transport: Arc<MemoryTransport>) -> TycAnalysisService {
        let client = ErpClient::new(transport, 100, 2);
        TycAnalysisService::new(
            RecordService::new(client, NormalizationRules::default()),
            20,
            Duration::from_secs(300),
        )
    }

    fn catalogue() -> MemoryTransport {
        MemoryTransport::new()
            .with_records(
                Resource::Articles,
                vec![
                    json!({ "id": 1, "name": "Ring", "fam": "rings" }),
                    json!({ "id": 2, "name": "Chain", "fam": "chains" }),
                ],
            )
            .with_records(Resource::Colors, vec![json!({ "id": 1, "name": "Gold" })])
            .with_records(
                Resource::Sizes,
                vec![json!({ "id": 12, "name": "12", "ord": 1 }), json!({ "id": 14, "name": "14", "ord": 2 })],
            )
            .with_records(
                Resource::Stock,
                vec![
                    json!({ "art": 1, "col": 1, "tll": { "12": 4, "14": "2" } }),
                    json!({ "art": 2, "col": 1, "tll": { "12": 1 } }),
                ],
            )
            .with_records(
                Resource::InvoiceLines,
                vec![json!({ "art": 1, "col": 1, "tll": 12, "can": 2 })],
            )
    }

    #[tokio::test]
    async fn test_service_builds_and_caches() {
        let transport = Arc::new(catalogue());
        let service = service(Arc::clone(&transport));
        let request = TycRequest {
            family: Some("rings".to_string()),
            ..TycRequest::default()
        };

        let matrix = service.analyze(&request).await.unwrap();
        assert_eq!(matrix.rows.len(), 1);
        assert_eq!(matrix.rows[0].article_name, "Ring");
        assert_eq!(matrix.rows[0].stock, vec![4.0, 2.0]);
        assert_eq!(matrix.rows[0].sales, vec![2.0, 0.0]);

        let requests = transport.request_count(Resource::Stock);
        let again = service.analyze(&request).await.unwrap();
        assert!(Arc::ptr_eq(&matrix, &again));
        assert_eq!(transport.request_count(Resource::Stock), requests);
        assert_eq!(service.cached_entries(), 1);

        service.invalidate();
        service.analyze(&request).await.unwrap();
        assert_eq!(transport.request_count(Resource::Stock), requests + 1);
    }

    #[tokio::test]
    async fn test_service_filters_by_article() {
        let service = service(Arc::new(catalogue()));
        let matrix = service
            .analyze(&TycRequest {
                article: Some(2),
                ..TycRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(matrix.rows.len(), 1);
        assert_eq!(matrix.rows[0].article_id, 2);
    }

    #[tokio::test]
    async fn test_service_surfaces_fetch_errors() {
        let transport = Arc::new(catalogue().failing(Resource::Stock, 1, 500));
        let err = service(transport).analyze(&TycRequest::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::Fetch { resource: Resource::Stock, .. }));
    }

    proptest! {
        #[test]
        fn prop_rotation_is_zero_without_stock(sales in 0.0f64..1e6, stock in 0.0f64..1e6) {
            if stock == 0.0 {
                prop_assert_eq!(rotation(sales, stock), 0.0);
            } else {
                prop_assert_eq!(rotation(sales, stock), sales / stock);
            }
            prop_assert_eq!(rotation(sales, 0.0), 0.0);
            prop_assert_eq!(coverage(stock, 0.0), 0.0);
        }

        #[test]
        fn prop_every_row_derives_ratios_from_its_totals(
            stock in prop::collection::vec((1i64..4, 1i64..4, 1i64..8, 0.0f64..500.0), 0..30),
            sales in prop::collection::vec((1i64..4, 1i64..4, 1i64..8, 0.0f64..50.0), 0..30),
            size_count in 0usize..8,
        ) {
            let articles: Vec<Article> = (1..4).map(article).collect();
            let sizes: Vec<Size> = (1..=size_count as i64).map(|id| size(id, 8 - id)).collect();
            let stock: Vec<StockRow> = stock
                .into_iter()
                .map(|(article, color, size, qty)| StockRow {
                    article,
                    color,
                    quantities: BTreeMap::from([(size, qty)]),
                })
                .collect();
            let sales: Vec<SaleLine> = sales
                .into_iter()
                .map(|(article, color, size, quantity)| SaleLine { article, color, size, quantity })
                .collect();

            let matrix = build_matrix(
                &TycInputs {
                    articles: &articles,
                    colors: &[],
                    sizes: &sizes,
                    stock: &stock,
                    sales: &sales,
                },
                MAX_SIZES,
            );

            prop_assert_eq!(matrix.sizes.len(), size_count);
            for row in &matrix.rows {
                prop_assert_eq!(row.stock.len(), size_count);
                prop_assert_eq!(row.sales.len(), size_count);
                prop_assert_eq!(row.rotation, rotation(row.total_sales, row.total_stock));
                prop_assert_eq!(row.coverage, coverage(row.total_stock, row.total_sales));
            }
            prop_assert_eq!(matrix.rotation, rotation(matrix.total_sales, matrix.total_stock));
        }
    }
}
