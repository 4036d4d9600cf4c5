#![doc(hidden)]

//! A proof-of-concept for the basic use case, mocking the client/server parts.

use sm3tree::{
    compat::{Digest, DigestHasher, Output},
    HashTree, InclusionProof, NonInclusionProof, Sm3,
};
use tracing::{info, warn};


const DATA: [&str; 3] = [
    "hello SM3 team",
    "here are some files to back up",
    "and a last one, just to make the count odd",
];

type File = String;
type Checksum = Output<Sm3>;
type MerkleTree = HashTree<DigestHasher<Sm3>>;

fn checksum(content: &File) -> Checksum {
    <Sm3 as Digest>::digest(content)
}

/// Hash trees over the checksums of the given files: in upload order, then sorted for absence proofs.
fn merkle_trees<'f>(files: impl IntoIterator<Item = &'f File>) -> Result<(MerkleTree, MerkleTree), &'static str> {
    let mut checksums: Vec<_> = files.into_iter().map(checksum).collect();
    let merkle_tree = MerkleTree::build(checksums.clone()).map_err(|_| "No file to back up...")?;

    checksums.sort();
    let manifest = MerkleTree::build(checksums).map_err(|_| "No file to back up...")?;

    Ok((merkle_tree, manifest))
}

#[derive(Default)]
struct Server {
    trees: Option<(MerkleTree, MerkleTree)>,
    uploaded_files: Vec<File>,
}

impl Server {
    async fn upload_file(&mut self, content: File, checksum: Checksum) -> Result<(), &'static str> {
        if checksum == self::checksum(&content) {
            self.uploaded_files.push(content);
            self.trees = None;

            info!("File successfully uploaded (checksum: {checksum:x})");

            Ok(())
        } else {
            Err("Upload failed, please retry...")
        }
    }

    async fn seal(&mut self) -> Result<(), &'static str> {
        self.trees = Some(merkle_trees(&self.uploaded_files)?);
        Ok(())
    }

    async fn download_file(&self, index: usize) -> Result<(File, InclusionProof<DigestHasher<Sm3>>), &'static str> {
        let (merkle_tree, _) = self.trees.as_ref().ok_or("Backup is not sealed yet...")?;

        if index < self.uploaded_files.len() {
            let file = self.uploaded_files[index].clone();
            let proof = merkle_tree.prove_inclusion(index).map_err(|_| "File not found...")?;

            Ok((file, proof))
        } else {
            Err("File not found...")
        }
    }

    async fn prove_absence(&self, checksum: &Checksum) -> Result<NonInclusionProof<DigestHasher<Sm3>>, &'static str> {
        let (_, manifest) = self.trees.as_ref().ok_or("Backup is not sealed yet...")?;

        manifest.prove_non_inclusion(checksum).map_err(|_| "Manifest is corrupted...")
    }

    fn alter_file(&mut self, index: usize) {
        if index < self.uploaded_files.len() {
            let file = &mut self.uploaded_files[index];
            *file = file
                .chars()
                .map(|c| match c {
                    _ if c.is_ascii_lowercase() => c.to_ascii_uppercase(),
                    _ if c.is_ascii_uppercase() => c.to_ascii_lowercase(),
                    _ => c,
                })
                .collect();

            warn!("Oh noes, file #{index} got corrupted on server side!!!");
        }
    }
}

#[derive(Default)]
struct Client {
    root_hash: Checksum,
    manifest_hash: Checksum,
    file_count: usize,
}

impl Client {
    async fn store_root_hashes(&mut self, (root_hash, manifest_hash): (Checksum, Checksum), file_count: usize) {
        self.root_hash = root_hash;
        self.manifest_hash = manifest_hash;
        self.file_count = file_count;
    }

    async fn backup_files(&self, server: &mut Server, files: impl IntoIterator<Item = File>) -> Result<(Checksum, Checksum), &'static str> {
        let files: Vec<_> = files.into_iter().collect();

        for file in &files {
            server.upload_file(file.clone(), checksum(file)).await?;
        }
        server.seal().await?;

        let (merkle_tree, manifest) = merkle_trees(&files)?;

        Ok((*merkle_tree.root(), *manifest.root()))
    }

    async fn restore_file(&self, server: &Server, index: usize) -> Result<File, &'static str> {
        let (file, proof) = server.download_file(index).await?;

        self.check_file(&file, proof)?;

        Ok(file)
    }

    fn check_file(&self, file: &File, proof: InclusionProof<DigestHasher<Sm3>>) -> Result<(), &'static str> {
        match proof.leaf_count() == self.file_count && proof.verify(&self.root_hash, &checksum(file)) {
            true => Ok(()),
            false => Err("File is corrupted!"),
        }
    }

    async fn check_absence(&self, server: &Server, file: &File) -> Result<(), &'static str> {
        let checksum = checksum(file);
        let proof = server.prove_absence(&checksum).await?;

        match proof.verify_strict(&self.manifest_hash, &checksum, self.file_count) {
            true => Ok(()),
            false if proof.bounds().is_present() => Err("File is part of the backup!"),
            false => Err("Absence proof is invalid!"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), &'static str> {
    const CORRUPTED_INDEX: usize = 2;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut server = Server::default();
    let mut client = Client::default();

    info!("Uploading files for backup...");
    let root_hashes = client.backup_files(&mut server, DATA.map(Into::into)).await?;

    info!("Storing local information... (root hash: {:x}, manifest hash: {:x})", root_hashes.0, root_hashes.1);
    client.store_root_hashes(root_hashes, DATA.len()).await;

    server.alter_file(CORRUPTED_INDEX);

    for index in 0..DATA.len() + 1 {
        let res = client.restore_file(&server, index).await;
        info!("Restoring file #{index}... {res:?}");
    }

    for file in ["a file that was never uploaded", DATA[0]] {
        let res = client.check_absence(&server, &file.into()).await;
        info!("Checking '{file}' is not part of the backup... {res:?}");
    }

    Ok(())
}
