mod helpers;

use helpers::{fixture, library, D1, D2, F1, F2, F3, F4, OTHER, TAG1, TAG10};

use std::{collections::BTreeMap, sync::Arc};

use pretty_assertions::assert_eq;
use tagshelf_core::{Error, ErrorKind, FileTagAddedBy, MemoryStore, SearchRequest, SearchResult};
use tracing_test::traced_test;

fn image_ids(result: &SearchResult) -> Vec<u64> {
	result.images.iter().map(|image| image.id).collect()
}

#[tokio::test]
#[traced_test]
async fn a_tagged_directory_matches_the_images_inside_it() {
	let store = Arc::new(
		MemoryStore::builder()
			.directory(D1, 0, "D1")
			.image(F2, D1, "F2.jpg")
			.tag(TAG1, 0, "tag1")
			.tag(TAG10, TAG1, "tag10")
			.file_tag(D1, TAG10, FileTagAddedBy::User)
			.build(),
	);

	let result = library(&store)
		.search()
		.search(SearchRequest::tag(TAG10).in_directory(D1))
		.await
		.unwrap();

	assert_eq!(image_ids(&result), vec![F2]);
	assert_eq!(result.tagged_images, BTreeMap::from([(TAG10, vec![F2])]));
}

#[tokio::test]
async fn inverted_search_returns_the_untagged_images() {
	let store = Arc::new(fixture().file_tag(F1, TAG1, FileTagAddedBy::User).build());

	let result = library(&store)
		.search()
		.search(SearchRequest::tag(TAG1).in_directory(D1).inverted())
		.await
		.unwrap();

	assert_eq!(image_ids(&result), vec![F2]);
	assert!(result.tagged_images.is_empty());
}

#[tokio::test]
async fn inverted_search_honours_child_tags_and_inheritance() {
	let store = Arc::new(
		fixture()
			.file_tag(F1, TAG10, FileTagAddedBy::User)
			.file_tag(D2, TAG1, FileTagAddedBy::User)
			.build(),
	);
	let library = library(&store);
	let search = library.search();

	let result = search
		.search(SearchRequest::tag(TAG1).in_directory(D1).inverted())
		.await
		.unwrap();
	assert_eq!(image_ids(&result), vec![F2]);

	let result = search
		.search(SearchRequest::tag(TAG1).in_directory(D2).inverted())
		.await
		.unwrap();
	assert!(result.images.is_empty());
}

#[tokio::test]
async fn tagging_a_directory_finds_everything_below_it() {
	let store = Arc::new(fixture().build());
	let library = library(&store);

	library
		.tags()
		.batch_update_tags_for_files(&[D1], &[OTHER], &[])
		.await
		.unwrap();

	let result = library
		.search()
		.search(SearchRequest::tag(OTHER))
		.await
		.unwrap();

	assert_eq!(image_ids(&result), vec![F3, F1, F2]);
	assert!(!image_ids(&result).contains(&F4));
	assert_eq!(
		result.tagged_images,
		BTreeMap::from([(OTHER, vec![F1, F2, F3])])
	);
}

#[tokio::test]
async fn images_are_counted_once_per_tag() {
	let store = Arc::new(
		fixture()
			.file_tag(D1, TAG1, FileTagAddedBy::User)
			.file_tag(F1, TAG10, FileTagAddedBy::User)
			.file_tag(F1, TAG1, FileTagAddedBy::Import)
			.file_tag(F4, TAG10, FileTagAddedBy::Suggestion)
			.build(),
	);

	let result = library(&store)
		.search()
		.search(SearchRequest::tag(TAG1))
		.await
		.unwrap();

	assert_eq!(image_ids(&result), vec![F3, F1, F2, F4]);
	assert_eq!(
		result.tagged_images,
		BTreeMap::from([(TAG1, vec![F1, F2, F3]), (TAG10, vec![F1, F4])])
	);
}

#[tokio::test]
async fn scoped_search_ignores_tagged_subdirectories() {
	let store = Arc::new(fixture().file_tag(D2, TAG1, FileTagAddedBy::User).build());
	let library = library(&store);
	let search = library.search();

	let result = search
		.search(SearchRequest::tag(TAG1).in_directory(D1))
		.await
		.unwrap();
	assert!(result.images.is_empty());

	let result = search
		.search(SearchRequest::tag(TAG1).in_directory(D2))
		.await
		.unwrap();
	assert_eq!(image_ids(&result), vec![F3]);
}

#[tokio::test]
async fn directory_only_search_lists_the_images_and_ignores_invert() {
	let store = Arc::new(fixture().build());
	let library = library(&store);
	let search = library.search();

	let listed = search.search(SearchRequest::directory(D1)).await.unwrap();
	assert_eq!(image_ids(&listed), vec![F1, F2]);

	let inverted = search
		.search(SearchRequest::directory(D1).inverted())
		.await
		.unwrap();
	assert_eq!(inverted, listed);
}

#[tokio::test]
async fn unknown_tags_match_nothing() {
	let store = Arc::new(fixture().file_tag(F1, TAG1, FileTagAddedBy::User).build());
	let library = library(&store);
	let search = library.search();

	let result = search.search(SearchRequest::tag(999)).await.unwrap();
	assert_eq!(result, SearchResult::default());

	let result = search
		.search(SearchRequest::tag(999).in_directory(D1).inverted())
		.await
		.unwrap();
	assert_eq!(image_ids(&result), vec![F1, F2]);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
	let store = Arc::new(fixture().build());
	let library = library(&store);
	let search = library.search();

	for request in [
		SearchRequest::default(),
		SearchRequest {
			tag_id: Some(0),
			directory_id: Some(0),
			invert: false,
		},
		SearchRequest::tag(TAG1).inverted(),
	] {
		let err = search.search(request).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{request:?}");
	}
	assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn unknown_directories_are_reported() {
	let store = Arc::new(fixture().build());
	let library = library(&store);
	let search = library.search();

	let err = search
		.search(SearchRequest::tag(TAG1).in_directory(404))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::DirectoryNotFound(404)));

	let err = search.search(SearchRequest::directory(F1)).await.unwrap_err();
	assert!(matches!(err, Error::DirectoryNotFound(F1)));
}

#[tokio::test]
async fn store_failures_abort_the_search() {
	let store = Arc::new(fixture().build());
	store.set_unavailable(true);

	let err = library(&store)
		.search()
		.search(SearchRequest::tag(TAG1).in_directory(D1))
		.await
		.unwrap_err();

	assert!(matches!(err, Error::Store(_)));
	assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn a_library_without_files_has_no_matches() {
	let store = Arc::new(
		MemoryStore::builder()
			.tag(TAG1, 0, "tag1")
			.tag(TAG10, TAG1, "tag10")
			.build(),
	);

	let result = library(&store)
		.search()
		.search(SearchRequest::tag(TAG1))
		.await
		.unwrap();

	assert_eq!(result, SearchResult::default());
}

#[tokio::test]
async fn associations_outside_an_empty_library_are_ignored() {
	let store = Arc::new(
		MemoryStore::builder()
			.tag(TAG1, 0, "tag1")
			.file_tag(F1, TAG1, FileTagAddedBy::User)
			.build(),
	);

	let result = library(&store)
		.search()
		.search(SearchRequest::tag(TAG1))
		.await
		.unwrap();

	assert_eq!(result, SearchResult::default());
}
