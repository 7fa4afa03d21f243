use crate::core::scorer::Scorer;
use crate::core::{
    CancelToken, ConfigProvider, FavoriteReport, Favoriter, ListingRecord, ListingSource, Pipeline,
    QualifyingJob, Score, ScoreBatch, ScoredListing, Storage,
};
use crate::domain::model::fill_job_id;
use crate::utils::error::Result;
use std::collections::HashSet;
use std::sync::Arc;

pub struct ScoutPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    source: Arc<dyn ListingSource>,
    scorer: Scorer,
    favoriter: Arc<dyn Favoriter>,
}

impl<S: Storage, C: ConfigProvider> ScoutPipeline<S, C> {
    pub fn new(
        storage: S,
        config: C,
        source: Arc<dyn ListingSource>,
        scorer: Scorer,
        favoriter: Arc<dyn Favoriter>,
    ) -> Self {
        Self {
            storage,
            config,
            source,
            scorer,
            favoriter,
        }
    }

    pub fn job_url(&self, job_id: &str) -> String {
        fill_job_id(self.config.job_url_template(), job_id)
    }

    /// Scores every listing and keeps those at or above `min_score`, in
    /// fetch order.
    pub async fn process_jobs(
        &self,
        raw_listings: &[ListingRecord],
        min_score: u8,
    ) -> Vec<QualifyingJob> {
        let batch = self.score_all(raw_listings, &CancelToken::new()).await;
        filter_qualifying(&batch.scored, min_score, |id| self.job_url(id))
    }
}

/// 依門檻篩選；未評分 (Unscored) 一律排除
pub fn filter_qualifying(
    scored: &[ScoredListing],
    min_score: u8,
    job_url: impl Fn(&str) -> String,
) -> Vec<QualifyingJob> {
    scored
        .iter()
        .filter_map(|s| match s.score {
            Score::Scored(score) if score >= min_score => Some(QualifyingJob {
                id: s.listing.id.clone(),
                title: s.listing.title.clone(),
                employer: s.listing.employer.clone(),
                score,
                url: job_url(&s.listing.id),
            }),
            _ => None,
        })
        .collect()
}

const CSV_HEADER: [&str; 5] = ["id", "title", "employer", "score", "url"];

fn qualifying_csv(jobs: &[QualifyingJob]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    // serialize 只會在第一筆資料時寫出標題列
    if jobs.is_empty() {
        writer.write_record(CSV_HEADER)?;
    }
    for job in jobs {
        writer.serialize(job)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| crate::utils::error::ScoutError::Io(e.into_error()))
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ScoutPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<ListingRecord>> {
        let listings = self.source.fetch_all(self.config.search_params()).await?;

        let raw: Vec<&serde_json::Value> = listings.iter().map(|l| &l.raw).collect();
        let json_data = serde_json::to_vec_pretty(&raw)?;
        self.storage
            .write_file(self.config.raw_file(), &json_data)
            .await?;
        tracing::info!(
            "💾 Raw fetch ({} listings) saved to {}",
            listings.len(),
            self.config.raw_file()
        );

        Ok(listings)
    }

    async fn score_all(&self, listings: &[ListingRecord], cancel: &CancelToken) -> ScoreBatch {
        let mut batch = ScoreBatch::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let total = listings.len();

        for (i, listing) in listings.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(
                    "🛑 Cancelled after scoring {}/{} listings",
                    batch.scored.len(),
                    total
                );
                batch.cancelled = true;
                break;
            }

            if !seen.insert(listing.id.as_str()) {
                tracing::debug!(job_id = %listing.id, "Listing already scored, skipping duplicate");
                continue;
            }

            tracing::info!(
                job_id = %listing.id,
                "Scoring job {}/{}: {} at {}",
                i + 1,
                total,
                listing.title,
                listing.employer
            );
            let score = self.scorer.score(listing).await;
            batch.scored.push(ScoredListing {
                listing: listing.clone(),
                score,
            });
        }

        batch
    }

    fn filter(&self, scored: &[ScoredListing]) -> Vec<QualifyingJob> {
        let min_score = self.config.min_score();
        let jobs = filter_qualifying(scored, min_score, |id| self.job_url(id));
        for job in &jobs {
            tracing::info!(job_id = %job.id, score = job.score, "✓ Qualifying: {} at {}", job.title, job.employer);
        }
        tracing::info!(
            "Found {} qualifying jobs out of {} scored (min score {})",
            jobs.len(),
            scored.len(),
            min_score
        );
        jobs
    }

    async fn favorite(&self, jobs: &[QualifyingJob]) -> FavoriteReport {
        let mut report = FavoriteReport::default();
        if !self.config.favorite_enabled() {
            tracing::info!("Favoriting disabled, skipping {} jobs", jobs.len());
            report.skipped = true;
            return report;
        }

        for job in jobs {
            match self.favoriter.mark_interested(&job.id).await {
                Ok(()) => report.favorited += 1,
                Err(e) => {
                    tracing::warn!(job_id = %job.id, error = %e, "⚠️ Favoriting failed, job kept in results");
                    report.failed.push(job.id.clone());
                }
            }
        }

        report
    }

    async fn load(&self, jobs: &[QualifyingJob]) -> Result<String> {
        let json_data = serde_json::to_vec_pretty(jobs)?;
        self.storage
            .write_file(self.config.filtered_file(), &json_data)
            .await?;

        if self.config.output_formats().iter().any(|f| f == "csv") {
            let csv_name = std::path::Path::new(self.config.filtered_file())
                .with_extension("csv")
                .to_string_lossy()
                .into_owned();
            self.storage
                .write_file(&csv_name, &qualifying_csv(jobs)?)
                .await?;
            tracing::debug!("CSV copy written to {}", csv_name);
        }

        let output_path = format!("{}/{}", self.config.output_path(), self.config.filtered_file());
        tracing::info!("💾 {} qualifying jobs saved to {}", jobs.len(), output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::ScoringConfig;
    use crate::core::{LanguageModel, ModelError, Prompt, SearchParams, StudentProfile};
    use crate::utils::error::ScoutError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        search: SearchParams,
        min_score: u8,
        formats: Vec<String>,
        favorite: bool,
    }

    impl MockConfig {
        fn new(min_score: u8) -> Self {
            Self {
                search: SearchParams {
                    job_type: 5,
                    industries: vec![],
                    posted_within_days: 7,
                    per_page: 100,
                    sort: "!postdate".to_string(),
                    max_pages: 1,
                    max_results: None,
                    extra: BTreeMap::new(),
                },
                min_score,
                formats: vec!["json".to_string()],
                favorite: true,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn search_params(&self) -> &SearchParams {
            &self.search
        }

        fn min_score(&self) -> u8 {
            self.min_score
        }

        fn job_url_template(&self) -> &str {
            "https://portal.test/jobs/search?currentJobId={job_id}"
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn raw_file(&self) -> &str {
            "response.json"
        }

        fn filtered_file(&self) -> &str {
            "good_jobs.json"
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn favorite_enabled(&self) -> bool {
            self.favorite
        }
    }

    struct StaticSource {
        listings: Vec<ListingRecord>,
    }

    #[async_trait]
    impl ListingSource for StaticSource {
        async fn fetch_all(&self, _params: &SearchParams) -> Result<Vec<ListingRecord>> {
            Ok(self.listings.clone())
        }
    }

    /// Replies with the score configured per listing title, or a timeout.
    struct TableModel {
        replies: HashMap<String, std::result::Result<String, ()>>,
        calls: StdMutex<Vec<String>>,
    }

    impl TableModel {
        fn new(entries: &[(&str, Option<&str>)]) -> Arc<Self> {
            Arc::new(Self {
                replies: entries
                    .iter()
                    .map(|(title, reply)| (title.to_string(), reply.map(str::to_string).ok_or(())))
                    .collect(),
                calls: StdMutex::new(Vec::new()),
            })
        }

        fn calls_for(&self, title: &str) -> usize {
            let needle = format!("Job Title: {}\n", title);
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|l| l.contains(&needle))
                .count()
        }
    }

    #[async_trait]
    impl LanguageModel for TableModel {
        async fn complete(&self, prompt: &Prompt) -> std::result::Result<String, ModelError> {
            self.calls.lock().unwrap().push(prompt.listing.clone());
            let reply = self
                .replies
                .iter()
                .find(|(title, _)| prompt.listing.contains(&format!("Job Title: {}\n", title)))
                .map(|(_, reply)| reply.clone());
            match reply {
                Some(Ok(text)) => Ok(text),
                Some(Err(())) => Err(ModelError::Timeout),
                None => Ok("0".to_string()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingFavoriter {
        fail_for: Vec<String>,
        calls: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Favoriter for RecordingFavoriter {
        async fn mark_interested(&self, listing_id: &str) -> Result<()> {
            self.calls.lock().unwrap().push(listing_id.to_string());
            if self.fail_for.iter().any(|id| id == listing_id) {
                return Err(ScoutError::Favoriting {
                    job_id: listing_id.to_string(),
                    message: "connection reset".to_string(),
                });
            }
            Ok(())
        }
    }

    fn listing(id: &str, title: &str, description: Option<&str>) -> ListingRecord {
        let mut raw = json!({"job_id": id, "job_title": title, "name": "Acme"});
        if let Some(desc) = description {
            raw["job_desc"] = json!(desc);
        }
        ListingRecord::from_value(raw, &Default::default()).unwrap()
    }

    fn profile() -> StudentProfile {
        StudentProfile {
            year: "sophomore".to_string(),
            major: "Data Science".to_string(),
            school: None,
            gpa: 3.7,
            skills: vec!["Python".to_string(), "SQL".to_string()],
            experience: vec![],
            interests: vec!["data science".to_string()],
            coursework: vec![],
            honors: vec![],
            preferences: None,
        }
    }

    fn scorer(model: Arc<TableModel>) -> Scorer {
        let config = ScoringConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 2,
            ..ScoringConfig::default()
        };
        Scorer::new(model, &profile(), &config)
    }

    fn pipeline(
        config: MockConfig,
        listings: Vec<ListingRecord>,
        model: Arc<TableModel>,
        favoriter: Arc<RecordingFavoriter>,
    ) -> (ScoutPipeline<MockStorage, MockConfig>, MockStorage) {
        let storage = MockStorage::new();
        let pipeline = ScoutPipeline::new(
            storage.clone(),
            config,
            Arc::new(StaticSource { listings }),
            scorer(model),
            favoriter,
        );
        (pipeline, storage)
    }

    #[tokio::test]
    async fn test_process_jobs_data_analyst_scenario() {
        let model = TableModel::new(&[("Data Analyst Co-op", Some("Score: 85, qualified and relevant"))]);
        let (pipeline, _) = pipeline(
            MockConfig::new(50),
            vec![],
            model,
            Arc::new(RecordingFavoriter::default()),
        );

        let listings = vec![listing("42", "Data Analyst Co-op", Some("SQL, Python required"))];
        let jobs = pipeline.process_jobs(&listings, 50).await;

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "42");
        assert_eq!(jobs[0].score, 85);
        assert!(jobs[0].url.contains("42"));
        assert_eq!(jobs[0].url, pipeline.job_url("42"));
    }

    #[tokio::test]
    async fn test_duplicate_identifier_is_scored_once() {
        let model = TableModel::new(&[("Page One", Some("70")), ("Page Two", Some("90"))]);
        let (pipeline, _) = pipeline(
            MockConfig::new(50),
            vec![],
            model.clone(),
            Arc::new(RecordingFavoriter::default()),
        );

        let listings = vec![
            listing("7", "Page One", Some("x")),
            listing("7", "Page Two", Some("x")),
        ];
        let batch = pipeline.score_all(&listings, &CancelToken::new()).await;

        assert_eq!(batch.scored.len(), 1);
        assert_eq!(batch.scored[0].score, Score::Scored(70));
        assert_eq!(model.calls_for("Page One"), 1);
        assert_eq!(model.calls_for("Page Two"), 0);
    }

    #[tokio::test]
    async fn test_filtering_is_monotonic_and_keeps_fetch_order() {
        let model = TableModel::new(&[
            ("A", Some("30")),
            ("B", Some("80")),
            ("C", Some("55")),
            ("D", Some("100")),
            ("E", None),
        ]);
        let (pipeline, _) = pipeline(
            MockConfig::new(0),
            vec![],
            model,
            Arc::new(RecordingFavoriter::default()),
        );
        let listings: Vec<ListingRecord> = ["A", "B", "C", "D", "E"]
            .iter()
            .enumerate()
            .map(|(i, t)| listing(&i.to_string(), t, Some("d")))
            .collect();

        let batch = pipeline.score_all(&listings, &CancelToken::new()).await;
        assert_eq!(batch.unscored_count(), 1);

        let mut previous: Option<Vec<String>> = None;
        for threshold in [100u8, 80, 55, 30, 0] {
            let ids: Vec<String> = filter_qualifying(&batch.scored, threshold, |id| pipeline.job_url(id))
                .into_iter()
                .map(|j| j.id)
                .collect();
            if let Some(stricter) = &previous {
                assert!(stricter.iter().all(|id| ids.contains(id)));
            }
            previous = Some(ids);
        }

        let at_zero: Vec<String> = filter_qualifying(&batch.scored, 0, |id| pipeline.job_url(id))
            .into_iter()
            .map(|j| j.title)
            .collect();
        assert_eq!(at_zero, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_threshold_is_inclusive_and_skips_unscored() {
        let scored: Vec<ScoredListing> = [
            ("1", Score::Scored(0)),
            ("2", Score::Scored(49)),
            ("3", Score::Scored(50)),
            ("4", Score::Unscored),
        ]
        .into_iter()
        .map(|(id, score)| ScoredListing {
            listing: listing(id, "T", None),
            score,
        })
        .collect();

        let ids = |min: u8| -> Vec<String> {
            filter_qualifying(&scored, min, |id| format!("u/{}", id))
                .into_iter()
                .map(|j| j.id)
                .collect()
        };
        assert_eq!(ids(0), vec!["1", "2", "3"]);
        assert_eq!(ids(50), vec!["3"]);
        assert!(ids(51).is_empty());
    }

    #[tokio::test]
    async fn test_timeout_listing_is_excluded_at_any_threshold() {
        let model = TableModel::new(&[("Flaky", None)]);
        let (pipeline, _) = pipeline(
            MockConfig::new(0),
            vec![],
            model.clone(),
            Arc::new(RecordingFavoriter::default()),
        );

        let jobs = pipeline.process_jobs(&[listing("1", "Flaky", Some("d"))], 0).await;

        assert!(jobs.is_empty());
        assert_eq!(model.calls_for("Flaky"), 3);
    }

    #[tokio::test]
    async fn test_missing_description_is_still_scored() {
        let model = TableModel::new(&[("No Desc", Some("60"))]);
        let (pipeline, _) = pipeline(
            MockConfig::new(50),
            vec![],
            model.clone(),
            Arc::new(RecordingFavoriter::default()),
        );

        let jobs = pipeline.process_jobs(&[listing("5", "No Desc", None)], 50).await;

        assert_eq!(jobs.len(), 1);
        let prompt = model.calls.lock().unwrap()[0].clone();
        assert!(prompt.ends_with("Job Description: "));
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_listing() {
        let model = TableModel::new(&[("A", Some("90")), ("B", Some("90"))]);
        let (pipeline, _) = pipeline(
            MockConfig::new(50),
            vec![],
            model.clone(),
            Arc::new(RecordingFavoriter::default()),
        );
        let cancel = CancelToken::new();
        cancel.cancel();

        let batch = pipeline
            .score_all(&[listing("1", "A", None), listing("2", "B", None)], &cancel)
            .await;

        assert!(batch.cancelled);
        assert!(batch.scored.is_empty());
        assert_eq!(model.calls.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_favoriting_failure_keeps_job() {
        let favoriter = Arc::new(RecordingFavoriter {
            fail_for: vec!["2".to_string()],
            ..Default::default()
        });
        let model = TableModel::new(&[("A", Some("90")), ("B", Some("95"))]);
        let (pipeline, storage) =
            pipeline(MockConfig::new(50), vec![], model, favoriter.clone());

        let listings = vec![listing("1", "A", None), listing("2", "B", None)];
        let batch = pipeline.score_all(&listings, &CancelToken::new()).await;
        let jobs = pipeline.filter(&batch.scored);
        let report = pipeline.favorite(&jobs).await;
        pipeline.load(&jobs).await.unwrap();

        assert_eq!(report.favorited, 1);
        assert_eq!(report.failed, vec!["2".to_string()]);
        assert_eq!(favoriter.calls.lock().unwrap().len(), 2);

        let saved: Vec<QualifyingJob> =
            serde_json::from_slice(&storage.get_file("good_jobs.json").await.unwrap()).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].id, "2");
    }

    #[tokio::test]
    async fn test_favoriting_disabled_makes_no_calls() {
        let favoriter = Arc::new(RecordingFavoriter::default());
        let mut config = MockConfig::new(50);
        config.favorite = false;
        let (pipeline, _) = pipeline(config, vec![], TableModel::new(&[]), favoriter.clone());

        let jobs = vec![QualifyingJob {
            id: "1".to_string(),
            title: "A".to_string(),
            employer: "Acme".to_string(),
            score: 90,
            url: "u".to_string(),
        }];
        let report = pipeline.favorite(&jobs).await;

        assert!(report.skipped);
        assert!(favoriter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_writes_raw_artifact() {
        let listings = vec![listing("1", "A", Some("d")), listing("2", "B", None)];
        let (pipeline, storage) = pipeline(
            MockConfig::new(50),
            listings,
            TableModel::new(&[]),
            Arc::new(RecordingFavoriter::default()),
        );

        let fetched = pipeline.extract().await.unwrap();
        assert_eq!(fetched.len(), 2);

        let raw: Vec<serde_json::Value> =
            serde_json::from_slice(&storage.get_file("response.json").await.unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0]["job_id"], "1");
    }

    #[tokio::test]
    async fn test_load_writes_empty_array_and_csv() {
        let mut config = MockConfig::new(50);
        config.formats = vec!["json".to_string(), "csv".to_string()];
        let (pipeline, storage) = pipeline(
            config,
            vec![],
            TableModel::new(&[]),
            Arc::new(RecordingFavoriter::default()),
        );

        let path = pipeline.load(&[]).await.unwrap();
        assert_eq!(path, "test_output/good_jobs.json");
        assert_eq!(storage.get_file("good_jobs.json").await.unwrap(), b"[]");
        assert_eq!(
            storage.get_file("good_jobs.csv").await.unwrap(),
            b"id,title,employer,score,url\n"
        );

        let jobs = vec![QualifyingJob {
            id: "9".to_string(),
            title: "Quant Co-op".to_string(),
            employer: "Fund".to_string(),
            score: 77,
            url: pipeline.job_url("9"),
        }];
        pipeline.load(&jobs).await.unwrap();
        let csv = String::from_utf8(storage.get_file("good_jobs.csv").await.unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,title,employer,score,url");
        assert!(lines[1].starts_with("9,Quant Co-op,Fund,77,"));
    }
}
